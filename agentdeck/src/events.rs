//! Typed agent events received from the chat runtime
//!
//! The runtime invokes two actions: relaying a task to an A2A agent and
//! displaying a component an agent generated. Each invocation arrives here as
//! an `AgentEvent` and is kept in an arrival-ordered log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::actions::CacheActions;
use crate::backend::{ActionParameter, CopilotAction};
use crate::config::DEFAULT_EVENT_LOG_CAPACITY;
use agentdeck_cache::CacheError;

pub const SEND_MESSAGE_TO_A2A_AGENT: &str = "send_message_to_a2a_agent";
pub const DISPLAY_GENERATED_COMPONENT: &str = "display_generated_component";

/// An action invocation, tagged by `action`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum AgentEvent {
    /// Orchestrator relayed a task to an A2A agent
    #[serde(rename = "send_message_to_a2a_agent", rename_all = "camelCase")]
    A2aMessage {
        agent_name: String,
        task: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },

    /// An agent produced a component to display
    #[serde(rename = "display_generated_component", rename_all = "camelCase")]
    ComponentGenerated {
        component_name: String,
        component_code: String,
    },
}

impl AgentEvent {
    pub fn action_name(&self) -> &'static str {
        match self {
            AgentEvent::A2aMessage { .. } => SEND_MESSAGE_TO_A2A_AGENT,
            AgentEvent::ComponentGenerated { .. } => DISPLAY_GENERATED_COMPONENT,
        }
    }
}

/// Definitions of the actions the chat runtime may invoke
pub fn action_definitions() -> Vec<CopilotAction> {
    vec![
        CopilotAction {
            id: SEND_MESSAGE_TO_A2A_AGENT.to_string(),
            name: SEND_MESSAGE_TO_A2A_AGENT.to_string(),
            description: "Sends a message to an A2A agent (Component Builder, etc.)".to_string(),
            parameters: vec![
                ActionParameter::string(
                    "agentName",
                    "The name of the A2A agent to send the message to",
                ),
                ActionParameter::string("task", "The message/task to send to the A2A agent"),
            ],
        },
        CopilotAction {
            id: DISPLAY_GENERATED_COMPONENT.to_string(),
            name: DISPLAY_GENERATED_COMPONENT.to_string(),
            description: "Displays a generated React component in the chat".to_string(),
            parameters: vec![
                ActionParameter::string("componentName", "Name of the component"),
                ActionParameter::string("componentCode", "The generated component TypeScript code"),
            ],
        },
    ]
}

/// An event as stored in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvent {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AgentEvent,
}

/// Arrival-ordered log of the most recent events
#[derive(Debug)]
pub struct EventLog {
    entries: RwLock<VecDeque<RecordedEvent>>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log holding at most `capacity` events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_LOG_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn record(&self, event: AgentEvent) -> RecordedEvent {
        let recorded = RecordedEvent {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            event,
        };
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(recorded.clone());
        recorded
    }

    pub async fn all(&self) -> Vec<RecordedEvent> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// A2A messages in arrival order
    pub async fn messages(&self) -> Vec<RecordedEvent> {
        self.filtered(|e| matches!(e, AgentEvent::A2aMessage { .. })).await
    }

    /// Generated components in arrival order
    pub async fn components(&self) -> Vec<RecordedEvent> {
        self.filtered(|e| matches!(e, AgentEvent::ComponentGenerated { .. })).await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn filtered(&self, keep: impl Fn(&AgentEvent) -> bool) -> Vec<RecordedEvent> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|r| keep(&r.event))
            .cloned()
            .collect()
    }
}

/// Receives agent events and applies their cache effects
pub struct AgentEvents {
    log: EventLog,
    actions: CacheActions,
}

impl AgentEvents {
    pub fn new(actions: CacheActions) -> Self {
        Self::with_log(actions, EventLog::new())
    }

    pub fn with_log(actions: CacheActions, log: EventLog) -> Self {
        Self { log, actions }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Record `event`; a generated component also invalidates the generated list
    pub async fn receive(&self, event: AgentEvent) -> Result<RecordedEvent, CacheError> {
        if let AgentEvent::ComponentGenerated { component_name, .. } = &event {
            self.actions.update_generated_components().await?;
            info!("Component generated: {}", component_name);
        }

        let recorded = self.log.record(event).await;
        Ok(recorded)
    }
}
