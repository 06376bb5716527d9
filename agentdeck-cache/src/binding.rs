//! Producer bindings and cache keys
//!
//! A producer is identified by its call site; its cache key is the call site plus
//! its arguments. The binding fixes which tags and which profile its entries get.

use crate::tag::Tag;
use crate::types::CacheKey;
use serde::{Deserialize, Serialize};

/// Tags + profile a producer stamps on every entry it creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBinding {
    pub tags: Vec<Tag>,
    pub profile: String,
}

impl CacheBinding {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            tags: Vec::new(),
            profile: profile.into(),
        }
    }

    /// Add a tag (duplicates ignored)
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }
}

/// Cache key builder: `site` or `site?name=value&...`
pub struct CacheKeyBuilder {
    site: String,
    args: Vec<(String, String)>,
}

impl CacheKeyBuilder {
    /// Create a new key builder for a call site
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument to the key
    pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((name.into(), value.to_string()));
        self
    }

    /// Add an optional argument; `None` still contributes so `f(None)` and `f()` differ from `f(x)`
    pub fn opt_arg(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        self.arg(name, value)
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        let mut key = self.site;

        if !self.args.is_empty() {
            let args: Vec<String> = self
                .args
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            key.push('?');
            key.push_str(&args.join("&"));
        }

        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;
    use crate::tag;

    #[test]
    fn test_key_without_args() {
        let key = CacheKeyBuilder::new("orchestrator_status").build();
        assert_eq!(key, "orchestrator_status");
    }

    #[test]
    fn test_key_with_args() {
        let key = CacheKeyBuilder::new("generated_components")
            .arg("limit", 10)
            .build();
        assert_eq!(key, "generated_components?limit=10");

        let none = CacheKeyBuilder::new("catalog_templates")
            .opt_arg("category", None::<&str>)
            .build();
        let some = CacheKeyBuilder::new("catalog_templates")
            .opt_arg("category", Some("forms"))
            .build();
        assert_eq!(none, "catalog_templates?category=");
        assert_eq!(some, "catalog_templates?category=forms");
    }

    #[test]
    fn test_binding_dedupes_tags() {
        let binding = CacheBinding::new(profile::AGENTS)
            .tag(tag::AGENT_STATS)
            .tag(tag::AGENT_STATS);
        assert_eq!(binding.tags.len(), 1);
        assert!(binding.has_tag("agent-stats"));
        assert!(!binding.has_tag("orchestrator-status"));
    }
}
