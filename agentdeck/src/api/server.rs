//! API server for agentdeck

use std::sync::Arc;

use agentdeck_cache::{CacheConfig, TagCache};
use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::feed::ChangeFeed;

use super::routes::{
    agent_capabilities, agent_stats, available_actions, cache_stats, catalog_templates,
    context_window, delete_template, generated_components, health_check, list_events,
    list_templates, orchestrator_metrics, orchestrator_status, receive_event, revalidate_tag,
    runtime_info, update_tag, upsert_template, AppState,
};

/// Configuration for the API server
#[derive(Debug, Clone, Default)]
pub struct ApiServerConfig {
    pub app: AppConfig,
    pub cache: CacheConfig,
}

impl ApiServerConfig {
    pub fn from_app_config(app: AppConfig) -> Self {
        Self {
            app,
            cache: CacheConfig::default(),
        }
    }
}

/// Build the gateway router over `state`
pub fn build_router(state: Arc<AppState>) -> Router {
    let runtime_url = state.copilot.runtime_url.clone();

    Router::new()
        .route("/health", get(health_check))
        // Cached reads
        .route("/api/agents/stats", get(agent_stats))
        .route("/api/agents/:name/capabilities", get(agent_capabilities))
        .route("/api/orchestrator/status", get(orchestrator_status))
        .route("/api/orchestrator/metrics", get(orchestrator_metrics))
        .route("/api/actions", get(available_actions))
        .route("/api/catalog/templates", get(catalog_templates))
        .route("/api/catalog/generated", get(generated_components))
        .route("/api/models/:name/context-window", get(context_window))
        // Template store
        .route("/api/templates", get(list_templates).post(upsert_template))
        .route("/api/templates/:id", delete(delete_template))
        // Cache control
        .route("/api/cache/revalidate", post(revalidate_tag))
        .route("/api/cache/update", post(update_tag))
        .route("/api/cache/stats", get(cache_stats))
        // Chat runtime
        .route(&runtime_url, get(runtime_info))
        .route(
            &format!("{}/events", runtime_url),
            get(list_events).post(receive_event),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Option<Arc<AppState>>,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig) -> Self {
        Self { config, state: None }
    }

    /// Create a new API server with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ApiServerConfig::default())
    }

    /// Serve an already wired state instead of building one from configuration
    pub fn with_state(mut self, state: Arc<AppState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        self.config.cache.validate()?;

        let state = match self.state {
            Some(state) => state,
            None => {
                let cache = TagCache::new(self.config.cache.clone());
                Arc::new(AppState::from_config(&self.config.app, cache, ChangeFeed::default()))
            }
        };

        let cleanup = state.cache.spawn_auto_cleanup();
        let cache = state.cache.clone();
        let app = build_router(state);

        // Start server
        let addr = self.config.app.bind_addr();
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Shutting down, waiting for background refreshes");
        cache.flush_refreshes().await;
        if let Some(handle) = cleanup {
            handle.abort();
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ComponentBuilderClient, OrchestratorClient};
    use crate::config::CopilotConfig;
    use crate::error::ConfigError;
    use crate::producers::Producers;
    use agentdeck_cache::ProfileRegistry;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn state_with(cache_config: CacheConfig) -> Arc<AppState> {
        state_with_copilot(cache_config, CopilotConfig::default())
    }

    fn state_with_copilot(cache_config: CacheConfig, copilot: CopilotConfig) -> Arc<AppState> {
        let cache = TagCache::new(cache_config);
        let producers = Producers::new(
            cache.clone(),
            OrchestratorClient::new("http://127.0.0.1:9"),
            ComponentBuilderClient::new("http://127.0.0.1:9"),
        );
        Arc::new(AppState::new(
            cache,
            producers,
            Err(ConfigError::MissingEnv("SUPABASE_URL".to_string())),
            copilot,
        ))
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_agent_stats_internal_failure() {
        let config = CacheConfig {
            profiles: ProfileRegistry::empty(),
            ..CacheConfig::default()
        };
        let (status, body) = get(build_router(state_with(config)), "/api/agents/stats").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch agent statistics");
    }

    #[tokio::test]
    async fn test_capabilities_route_falls_back() {
        let router = build_router(state_with(CacheConfig::default()));
        let (status, body) = get(router, "/api/agents/component-builder/capabilities").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "component-builder");
        assert_eq!(body["status"], "offline");
    }

    #[tokio::test]
    async fn test_generated_limit_must_be_numeric() {
        let router = build_router(state_with(CacheConfig::default()));
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/catalog/generated?limit=many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_event_log_respects_configured_capacity() {
        let copilot = CopilotConfig {
            event_log_capacity: 2,
            ..CopilotConfig::default()
        };
        let router = build_router(state_with_copilot(CacheConfig::default(), copilot));

        for task in ["one", "two", "three"] {
            let body = serde_json::json!({
                "action": "send_message_to_a2a_agent",
                "agentName": "component-builder",
                "task": task
            });
            let response = router
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/copilotkit/events")
                        .header("content-type", "application/json")
                        .body(Body::from(body.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let (status, events) = get(router, "/api/copilotkit/events").await;
        assert_eq!(status, StatusCode::OK);
        let tasks: Vec<&str> = events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["task"].as_str().unwrap())
            .collect();
        assert_eq!(tasks, vec!["two", "three"]);
    }
}
