//! Process configuration read from the environment
//!
//! `.env` files are loaded by the binary before `AppConfig::from_env` runs.

use crate::error::ConfigError;
use crate::supabase::SupabaseConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://localhost:8001";
pub const DEFAULT_COMPONENT_BUILDER_URL: &str = "http://localhost:8002";
pub const DEFAULT_COPILOT_AGENT: &str = "a2a_chat";
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1000;

/// Runtime configuration of the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotConfig {
    /// Agent the chat UI talks to
    pub agent: String,
    /// Mount point of the runtime routes
    pub runtime_url: String,
    /// Received events kept in memory; the oldest is dropped past this
    pub event_log_capacity: usize,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            agent: DEFAULT_COPILOT_AGENT.to_string(),
            runtime_url: "/api/copilotkit".to_string(),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub orchestrator_url: String,
    pub component_builder_url: String,
    pub copilot: CopilotConfig,
    pub supabase: SupabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            orchestrator_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            component_builder_url: DEFAULT_COMPONENT_BUILDER_URL.to_string(),
            copilot: CopilotConfig::default(),
            supabase: SupabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = parse_var(get("AGENTDECK_PORT"), "AGENTDECK_PORT", defaults.port)?;
        let event_log_capacity = parse_var(
            get("COPILOT_EVENT_LOG_CAPACITY"),
            "COPILOT_EVENT_LOG_CAPACITY",
            defaults.copilot.event_log_capacity,
        )?;
        if event_log_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "COPILOT_EVENT_LOG_CAPACITY".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host: get("AGENTDECK_HOST").unwrap_or(defaults.host),
            port,
            orchestrator_url: get("ORCHESTRATOR_API_URL").unwrap_or(defaults.orchestrator_url),
            component_builder_url: get("COMPONENT_BUILDER_API_URL")
                .unwrap_or(defaults.component_builder_url),
            copilot: CopilotConfig {
                agent: get("COPILOT_AGENT").unwrap_or(defaults.copilot.agent),
                event_log_capacity,
                ..defaults.copilot
            },
            supabase: SupabaseConfig::from_lookup(&get),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.orchestrator_url, "http://localhost:8001");
        assert_eq!(config.component_builder_url, "http://localhost:8002");
        assert_eq!(config.copilot.agent, "a2a_chat");
        assert_eq!(config.copilot.event_log_capacity, DEFAULT_EVENT_LOG_CAPACITY);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert!(config.supabase.url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AGENTDECK_PORT", "9000"),
            ("ORCHESTRATOR_API_URL", "http://orch:1"),
            ("COMPONENT_BUILDER_API_URL", ""),
            ("SUPABASE_URL", "https://db.example"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.orchestrator_url, "http://orch:1");
        // Empty means unset
        assert_eq!(config.component_builder_url, DEFAULT_COMPONENT_BUILDER_URL);
        assert_eq!(config.supabase.url.as_deref(), Some("https://db.example"));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup(&[("AGENTDECK_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("AGENTDECK_PORT"));
    }

    #[test]
    fn test_event_log_capacity() {
        let config = AppConfig::from_lookup(lookup(&[("COPILOT_EVENT_LOG_CAPACITY", "25")])).unwrap();
        assert_eq!(config.copilot.event_log_capacity, 25);

        for bad in ["0", "lots"] {
            let err = AppConfig::from_lookup(lookup(&[("COPILOT_EVENT_LOG_CAPACITY", bad)])).unwrap_err();
            assert!(err.to_string().contains("COPILOT_EVENT_LOG_CAPACITY"));
        }
    }
}
