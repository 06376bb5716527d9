//! Clients for the orchestrator and component-builder services

pub mod client;
pub mod types;

pub use client::{BackendClient, ComponentBuilderClient, OrchestratorClient};
pub use types::{
    ActionParameter, AgentCapabilities, AgentStatus, CatalogTemplate, CopilotAction,
    GeneratedComponent, OrchestratorMetrics, OrchestratorStatus, ServiceStats,
};
