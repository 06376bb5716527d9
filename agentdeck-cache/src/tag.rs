//! Cache tags
//!
//! A tag names an invalidation class. Every entry carries one or more tags and
//! invalidating a tag touches every entry that carries it.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Tag::new(s)
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Tag(s)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub const AGENT_STATS: &str = "agent-stats";
pub const ORCHESTRATOR_STATUS: &str = "orchestrator-status";
pub const ORCHESTRATOR_METRICS: &str = "orchestrator-metrics";
pub const COMPONENT_TEMPLATES: &str = "component-templates";
pub const GENERATED_COMPONENTS: &str = "generated-components";
pub const COPILOT_ACTIONS: &str = "copilot-actions";

/// Per-agent capability tag
pub fn agent_capabilities(agent_name: &str) -> Tag {
    Tag(format!("agent-capabilities-{}", agent_name))
}

/// Per-model context window tag
pub fn llm_context(model_name: &str) -> Tag {
    Tag(format!("llm-context-{}", model_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterized_tags() {
        assert_eq!(agent_capabilities("component-builder").as_str(), "agent-capabilities-component-builder");
        assert_eq!(llm_context("gpt-4").to_string(), "llm-context-gpt-4");
    }

    #[test]
    fn test_tag_serializes_as_string() {
        let json = serde_json::to_string(&Tag::from(AGENT_STATS)).unwrap();
        assert_eq!(json, "\"agent-stats\"");

        let tag: Tag = serde_json::from_str("\"component-templates\"").unwrap();
        assert_eq!(tag, Tag::from(COMPONENT_TEMPLATES));
    }
}
