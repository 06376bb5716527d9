//! Invalidation actions exposed to write paths and the HTTP surface

use std::sync::Arc;

use agentdeck_cache::{
    profile, tag, CacheError, InvalidationEvent, Invalidator, RevalidateProfile, Tag,
};
use tracing::debug;

/// Named invalidations over an `Invalidator`
#[derive(Clone)]
pub struct CacheActions {
    invalidator: Arc<dyn Invalidator>,
}

impl CacheActions {
    pub fn new(invalidator: Arc<dyn Invalidator>) -> Self {
        Self { invalidator }
    }

    /// Mark `tag` stale under `profile`
    pub async fn revalidate_by_tag(
        &self,
        tag: impl Into<Tag>,
        profile: impl Into<RevalidateProfile>,
    ) -> Result<InvalidationEvent, CacheError> {
        let tag = tag.into();
        let event = self.invalidator.revalidate_tag(&tag, profile.into()).await?;
        debug!("Revalidated tag {} ({} entries)", tag, event.keys.len());
        Ok(event)
    }

    /// Drop `tag` so the next read recomputes
    pub async fn update_by_tag(&self, tag: impl Into<Tag>) -> Result<InvalidationEvent, CacheError> {
        let tag = tag.into();
        let event = self.invalidator.update_tag(&tag).await?;
        debug!("Updated tag {} ({} entries)", tag, event.keys.len());
        Ok(event)
    }

    pub async fn revalidate_agent_stats(&self) -> Result<InvalidationEvent, CacheError> {
        self.revalidate_by_tag(tag::AGENT_STATS, profile::AGENTS).await
    }

    pub async fn revalidate_orchestrator_status(&self) -> Result<InvalidationEvent, CacheError> {
        self.revalidate_by_tag(tag::ORCHESTRATOR_STATUS, profile::AGENTS).await
    }

    pub async fn revalidate_orchestrator_metrics(&self) -> Result<InvalidationEvent, CacheError> {
        self.revalidate_by_tag(tag::ORCHESTRATOR_METRICS, profile::AGENTS).await
    }

    pub async fn revalidate_agent_capabilities(&self, agent_name: &str) -> Result<InvalidationEvent, CacheError> {
        self.revalidate_by_tag(tag::agent_capabilities(agent_name), profile::AGENTS)
            .await
    }

    pub async fn revalidate_component_templates(&self) -> Result<InvalidationEvent, CacheError> {
        self.revalidate_by_tag(tag::COMPONENT_TEMPLATES, profile::HOURS).await
    }

    pub async fn revalidate_generated_components(&self) -> Result<InvalidationEvent, CacheError> {
        self.revalidate_by_tag(tag::GENERATED_COMPONENTS, profile::MINUTES).await
    }

    pub async fn update_component_templates(&self) -> Result<InvalidationEvent, CacheError> {
        self.update_by_tag(tag::COMPONENT_TEMPLATES).await
    }

    pub async fn update_generated_components(&self) -> Result<InvalidationEvent, CacheError> {
        self.update_by_tag(tag::GENERATED_COMPONENTS).await
    }

    pub async fn update_agent_capabilities(&self, agent_name: &str) -> Result<InvalidationEvent, CacheError> {
        self.update_by_tag(tag::agent_capabilities(agent_name)).await
    }
}
