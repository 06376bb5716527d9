pub mod actions;
pub mod api;
pub mod backend;
pub mod bindings;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod producers;
pub mod supabase;
pub mod templates;

pub use actions::CacheActions;
pub use api::{ApiServer, ApiServerConfig, AppState};
pub use backend::{BackendClient, ComponentBuilderClient, OrchestratorClient};
pub use config::AppConfig;
pub use error::{ApiError, BackendError, ConfigError, TemplateStoreError};
pub use events::{AgentEvent, AgentEvents, EventLog};
pub use feed::{ChangeEvent, ChangeFeed, Subscription, TemplateChange};
pub use producers::{AgentStatsReport, Producers};
pub use supabase::{create_browser_client, create_server_client, SupabaseClient, SupabaseConfig};
pub use templates::{Template, TemplateRepository, TemplateStore, WriteAck};
