//! Wire types of the backend services (camelCase JSON)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Orchestrator liveness summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    /// Milliseconds since start
    pub uptime: f64,
    pub active_agents: Vec<String>,
    pub tasks_completed: u64,
    pub last_updated: DateTime<Utc>,
}

impl OrchestratorStatus {
    /// Reported when the orchestrator cannot be reached
    pub fn fallback() -> Self {
        Self {
            uptime: 0.0,
            active_agents: Vec::new(),
            tasks_completed: 0,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorMetrics {
    pub total_agents: u64,
    pub active_agents: u64,
    pub tasks_queued: u64,
    pub tasks_completed: u64,
    pub average_task_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
}

impl ActionParameter {
    pub fn string(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: "string".to_string(),
            description: description.to_string(),
        }
    }
}

/// An action the chat runtime may invoke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopilotAction {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: Vec<ActionParameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub name: String,
    pub capabilities: Vec<String>,
    pub status: AgentStatus,
    pub version: String,
}

impl AgentCapabilities {
    /// Reported when the agent cannot be reached
    pub fn offline(agent_name: &str) -> Self {
        Self {
            name: agent_name.to_string(),
            capabilities: Vec::new(),
            status: AgentStatus::Offline,
            version: "unknown".to_string(),
        }
    }
}

/// Template offered by the component-builder catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub preview: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedComponent {
    pub id: String,
    pub name: String,
    pub code: String,
    pub generated_at: DateTime<Utc>,
    pub agent: String,
}

/// Stats of one service: the upstream object verbatim, or an offline marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceStats(pub Value);

impl ServiceStats {
    pub fn offline() -> Self {
        Self(json!({ "status": "offline", "error": "Failed to connect" }))
    }

    pub fn is_offline(&self) -> bool {
        self.0.get("status").and_then(Value::as_str) == Some("offline")
    }
}
