//! Cache bindings and keys of every cached read path
//!
//! A binding ties a producer to the tags its entries carry and the profile
//! that governs their lifetime. Write paths invalidate through the same tags.

use agentdeck_cache::{profile, tag, CacheBinding, CacheKey, CacheKeyBuilder};

pub fn agent_stats() -> CacheBinding {
    CacheBinding::new(profile::AGENTS).tag(tag::AGENT_STATS)
}

pub fn agent_stats_key() -> CacheKey {
    CacheKeyBuilder::new("agent_stats").build()
}

pub fn orchestrator_status() -> CacheBinding {
    CacheBinding::new(profile::AGENTS).tag(tag::ORCHESTRATOR_STATUS)
}

pub fn orchestrator_status_key() -> CacheKey {
    CacheKeyBuilder::new("orchestrator_status").build()
}

pub fn orchestrator_metrics() -> CacheBinding {
    CacheBinding::new(profile::AGENTS).tag(tag::ORCHESTRATOR_METRICS)
}

pub fn orchestrator_metrics_key() -> CacheKey {
    CacheKeyBuilder::new("orchestrator_metrics").build()
}

pub fn agent_capabilities(agent_name: &str) -> CacheBinding {
    CacheBinding::new(profile::AGENTS).tag(tag::agent_capabilities(agent_name))
}

pub fn agent_capabilities_key(agent_name: &str) -> CacheKey {
    CacheKeyBuilder::new("agent_capabilities")
        .arg("agent", agent_name)
        .build()
}

pub fn available_actions() -> CacheBinding {
    CacheBinding::new(profile::HOURS).tag(tag::COPILOT_ACTIONS)
}

pub fn available_actions_key() -> CacheKey {
    CacheKeyBuilder::new("available_actions").build()
}

/// Builder-service catalog; shares its tag with the template store
pub fn catalog_templates() -> CacheBinding {
    CacheBinding::new(profile::HOURS).tag(tag::COMPONENT_TEMPLATES)
}

pub fn catalog_templates_key(category: Option<&str>) -> CacheKey {
    CacheKeyBuilder::new("catalog_templates")
        .opt_arg("category", category)
        .build()
}

pub fn generated_components() -> CacheBinding {
    CacheBinding::new(profile::MINUTES).tag(tag::GENERATED_COMPONENTS)
}

pub fn generated_components_key(limit: usize) -> CacheKey {
    CacheKeyBuilder::new("generated_components")
        .arg("limit", limit)
        .build()
}

pub fn llm_context_window(model: &str) -> CacheBinding {
    CacheBinding::new(profile::DAYS).tag(tag::llm_context(model))
}

pub fn llm_context_window_key(model: &str) -> CacheKey {
    CacheKeyBuilder::new("llm_context_window")
        .arg("model", model)
        .build()
}

pub fn component_templates() -> CacheBinding {
    CacheBinding::new(profile::HOURS).tag(tag::COMPONENT_TEMPLATES)
}

pub fn component_templates_key() -> CacheKey {
    CacheKeyBuilder::new("component_templates").build()
}
