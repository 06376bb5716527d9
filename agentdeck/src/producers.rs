//! Cached read paths over the backend services
//!
//! Each producer computes through the tag cache under the binding declared in
//! `bindings`. Backend failures never reach the caller: they are logged and
//! replaced by a fallback value, which is cached like any other value.

use agentdeck_cache::profile::{self, humanize};
use agentdeck_cache::{CacheError, CacheProfile, TagCache};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::backend::{
    AgentCapabilities, CatalogTemplate, ComponentBuilderClient, CopilotAction, GeneratedComponent,
    OrchestratorClient, OrchestratorMetrics, OrchestratorStatus, ServiceStats,
};
use crate::bindings;
use crate::error::BackendError;

pub const DEFAULT_GENERATED_LIMIT: usize = 10;
pub const DEFAULT_CONTEXT_WINDOW: u32 = 4096;

/// Known model context windows, in tokens
pub const CONTEXT_WINDOWS: &[(&str, u32)] = &[
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8192),
    ("gpt-3.5-turbo", 4096),
    ("claude-3-opus", 200_000),
    ("claude-3-sonnet", 200_000),
    ("claude-3-haiku", 200_000),
    ("gemini-pro", 32_000),
];

/// Context window of `model`, or `DEFAULT_CONTEXT_WINDOW` for unknown models
pub fn context_window(model: &str) -> u32 {
    CONTEXT_WINDOWS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, tokens)| *tokens)
        .unwrap_or(DEFAULT_CONTEXT_WINDOW)
}

/// Cache lifetime summary attached to aggregated stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub profile: String,
    pub revalidates_in: String,
    pub expires_in: String,
}

impl CacheInfo {
    pub fn for_profile(name: &str, profile: &CacheProfile) -> Self {
        Self {
            profile: name.to_string(),
            revalidates_in: humanize(profile.revalidate),
            expires_in: humanize(profile.expire),
        }
    }
}

/// Aggregated stats of both backend services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatsReport {
    pub timestamp: DateTime<Utc>,
    pub orchestrator: ServiceStats,
    pub component_builder: ServiceStats,
    pub cache_info: CacheInfo,
}

/// Resolve a backend result, logging and substituting `fallback` on failure
fn or_fallback<T>(what: &str, result: Result<Option<T>, BackendError>, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(Some(value)) => value,
        Ok(None) => {
            warn!("Failed to fetch {}: non-success response", what);
            fallback()
        }
        Err(e) => {
            error!("Error fetching {}: {}", what, e);
            fallback()
        }
    }
}

/// All cached read paths
#[derive(Clone)]
pub struct Producers {
    cache: TagCache,
    orchestrator: OrchestratorClient,
    builder: ComponentBuilderClient,
}

impl Producers {
    pub fn new(cache: TagCache, orchestrator: OrchestratorClient, builder: ComponentBuilderClient) -> Self {
        Self {
            cache,
            orchestrator,
            builder,
        }
    }

    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    /// Stats of both services, fetched concurrently
    pub async fn agent_stats(&self) -> Result<AgentStatsReport, CacheError> {
        let orchestrator = self.orchestrator.clone();
        let builder = self.builder.clone();
        let cache_info = CacheInfo::for_profile(profile::AGENTS, &self.cache.profile(profile::AGENTS)?);

        self.cache
            .get_or_compute(bindings::agent_stats_key(), &bindings::agent_stats(), move || async move {
                let (orchestrator_stats, builder_stats) =
                    tokio::join!(orchestrator.stats(), builder.stats());

                Ok::<_, CacheError>(AgentStatsReport {
                    timestamp: Utc::now(),
                    orchestrator: ServiceStats(or_fallback(
                        "orchestrator stats",
                        orchestrator_stats,
                        || ServiceStats::offline().0,
                    )),
                    component_builder: ServiceStats(or_fallback(
                        "component builder stats",
                        builder_stats,
                        || ServiceStats::offline().0,
                    )),
                    cache_info,
                })
            })
            .await
    }

    pub async fn orchestrator_status(&self) -> Result<OrchestratorStatus, CacheError> {
        let client = self.orchestrator.clone();
        self.cache
            .get_or_compute(
                bindings::orchestrator_status_key(),
                &bindings::orchestrator_status(),
                move || async move {
                    Ok::<_, CacheError>(or_fallback(
                        "orchestrator status",
                        client.status().await,
                        OrchestratorStatus::fallback,
                    ))
                },
            )
            .await
    }

    pub async fn orchestrator_metrics(&self) -> Result<OrchestratorMetrics, CacheError> {
        let client = self.orchestrator.clone();
        self.cache
            .get_or_compute(
                bindings::orchestrator_metrics_key(),
                &bindings::orchestrator_metrics(),
                move || async move {
                    Ok::<_, CacheError>(or_fallback(
                        "orchestrator metrics",
                        client.metrics().await,
                        OrchestratorMetrics::default,
                    ))
                },
            )
            .await
    }

    pub async fn agent_capabilities(&self, agent_name: &str) -> Result<AgentCapabilities, CacheError> {
        let client = self.orchestrator.clone();
        let name = agent_name.to_string();
        self.cache
            .get_or_compute(
                bindings::agent_capabilities_key(agent_name),
                &bindings::agent_capabilities(agent_name),
                move || async move {
                    let result = client.capabilities(&name).await;
                    Ok::<_, CacheError>(or_fallback(
                        &format!("{} capabilities", name),
                        result,
                        || AgentCapabilities::offline(&name),
                    ))
                },
            )
            .await
    }

    pub async fn available_actions(&self) -> Result<Vec<CopilotAction>, CacheError> {
        let client = self.orchestrator.clone();
        self.cache
            .get_or_compute(
                bindings::available_actions_key(),
                &bindings::available_actions(),
                move || async move {
                    Ok::<_, CacheError>(or_fallback("copilot actions", client.actions().await, Vec::new))
                },
            )
            .await
    }

    /// Builder catalog, optionally narrowed to one category
    pub async fn catalog_templates(&self, category: Option<&str>) -> Result<Vec<CatalogTemplate>, CacheError> {
        let client = self.builder.clone();
        let owned = category.map(str::to_string);
        self.cache
            .get_or_compute(
                bindings::catalog_templates_key(category),
                &bindings::catalog_templates(),
                move || async move {
                    let result = client.templates(owned.as_deref()).await;
                    Ok::<_, CacheError>(or_fallback("component templates", result, Vec::new))
                },
            )
            .await
    }

    pub async fn generated_components(&self, limit: usize) -> Result<Vec<GeneratedComponent>, CacheError> {
        let client = self.builder.clone();
        self.cache
            .get_or_compute(
                bindings::generated_components_key(limit),
                &bindings::generated_components(),
                move || async move {
                    Ok::<_, CacheError>(or_fallback(
                        "generated components",
                        client.generated(limit).await,
                        Vec::new,
                    ))
                },
            )
            .await
    }

    pub async fn llm_context_window(&self, model: &str) -> Result<u32, CacheError> {
        let owned = model.to_string();
        self.cache
            .get_or_compute(
                bindings::llm_context_window_key(model),
                &bindings::llm_context_window(model),
                move || async move { Ok::<_, CacheError>(context_window(&owned)) },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_cache::CacheConfig;

    /// Nothing listens on port 9 locally, so every request fails to connect
    fn offline_producers() -> Producers {
        Producers::new(
            TagCache::new(CacheConfig::default()),
            OrchestratorClient::new("http://127.0.0.1:9"),
            ComponentBuilderClient::new("http://127.0.0.1:9"),
        )
    }

    #[test]
    fn test_context_window_table() {
        assert_eq!(context_window("gpt-4"), 8192);
        assert_eq!(context_window("gpt-4-turbo"), 128_000);
        assert_eq!(context_window("claude-3-haiku"), 200_000);
        assert_eq!(context_window("gemini-pro"), 32_000);
        assert_eq!(context_window("unknown-model"), 4096);
    }

    #[test]
    fn test_cache_info_from_agents_profile() {
        let info = CacheInfo::for_profile(profile::AGENTS, &CacheProfile::from_secs(60, 300, 3600));
        assert_eq!(info.revalidates_in, "5 minutes");
        assert_eq!(info.expires_in, "1 hour");
    }

    #[tokio::test]
    async fn test_unreachable_services_fall_back() {
        let producers = offline_producers();

        let stats = producers.agent_stats().await.unwrap();
        assert!(stats.orchestrator.is_offline());
        assert!(stats.component_builder.is_offline());
        assert_eq!(stats.cache_info.profile, "agents");

        let status = producers.orchestrator_status().await.unwrap();
        assert!(status.active_agents.is_empty());
        assert_eq!(status.tasks_completed, 0);

        assert_eq!(producers.orchestrator_metrics().await.unwrap(), OrchestratorMetrics::default());
        assert_eq!(
            producers.agent_capabilities("builder").await.unwrap(),
            AgentCapabilities::offline("builder")
        );
        assert!(producers.available_actions().await.unwrap().is_empty());
        assert!(producers.catalog_templates(None).await.unwrap().is_empty());
        assert!(producers.generated_components(DEFAULT_GENERATED_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallbacks_are_cached() {
        let producers = offline_producers();

        let first = producers.agent_stats().await.unwrap();
        let second = producers.agent_stats().await.unwrap();
        assert_eq!(first.timestamp, second.timestamp);

        let stats = producers.cache().stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_llm_context_window_cached_per_model() {
        let producers = offline_producers();
        assert_eq!(producers.llm_context_window("gpt-4").await.unwrap(), 8192);
        assert_eq!(producers.llm_context_window("mystery").await.unwrap(), 4096);
        assert_eq!(producers.cache().len().await, 2);
    }
}
