//! Error types for the gateway

use agentdeck_cache::CacheError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Invalid or missing configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required env var: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Failure talking to a backend service
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {service} failed: {source}")]
    Transport {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed response from {service}: {source}")]
    Decode {
        service: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure in the template store
#[derive(Error, Debug)]
pub enum TemplateStoreError {
    /// Error reported by the database, message passed through unchanged
    #[error("{0}")]
    Backend(String),

    #[error("Template request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Error returned by HTTP handlers, rendered as `{ "error": message }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Templates(#[from] TemplateStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal failure reported with a fixed public message
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Cache(CacheError::UnknownProfile(_)) => StatusCode::BAD_REQUEST,
            ApiError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Templates(TemplateStoreError::Config(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Templates(TemplateStoreError::Backend(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
