//! HTTP gateway for agentdeck

pub mod routes;
pub mod server;

pub use routes::AppState;
pub use server::{build_router, ApiServer, ApiServerConfig};
