//! HTTP clients for the backend services

use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::types::{
    AgentCapabilities, CatalogTemplate, CopilotAction, GeneratedComponent, OrchestratorMetrics,
    OrchestratorStatus,
};
use crate::error::BackendError;

/// JSON-over-HTTP client bound to one service base URL
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    service: String,
    base_url: String,
}

impl BackendClient {
    pub fn new(service: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), service, base_url)
    }

    /// Share an existing connection pool
    pub fn with_client(
        http: reqwest::Client,
        service: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            service: service.into(),
            base_url: base_url.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `base/segments...?query`, escaping each path segment
    pub fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, BackendError> {
        let invalid = |reason: String| BackendError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET a JSON document
    ///
    /// `Ok(None)` for a non-2xx status, `Err` when the request fails or the
    /// body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, BackendError> {
        let response = self
            .http
            .get(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                service: self.service.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} returned {} for {}", self.service, status, url);
            return Ok(None);
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|source| BackendError::Decode {
                service: self.service.clone(),
                source,
            })?;
        Ok(Some(body))
    }
}

/// Client of the orchestrator agent service
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    client: BackendClient,
}

impl OrchestratorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_client(BackendClient::new("orchestrator", base_url))
    }

    pub fn from_client(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &BackendClient {
        &self.client
    }

    pub async fn stats(&self) -> Result<Option<Value>, BackendError> {
        self.client.get_json(self.client.url(&["api", "stats"], &[])?).await
    }

    pub async fn status(&self) -> Result<Option<OrchestratorStatus>, BackendError> {
        self.client.get_json(self.client.url(&["api", "status"], &[])?).await
    }

    pub async fn metrics(&self) -> Result<Option<OrchestratorMetrics>, BackendError> {
        self.client.get_json(self.client.url(&["api", "metrics"], &[])?).await
    }

    pub async fn actions(&self) -> Result<Option<Vec<CopilotAction>>, BackendError> {
        self.client.get_json(self.client.url(&["api", "actions"], &[])?).await
    }

    pub async fn capabilities(&self, agent_name: &str) -> Result<Option<AgentCapabilities>, BackendError> {
        let url = self
            .client
            .url(&["api", "agents", agent_name, "capabilities"], &[])?;
        self.client.get_json(url).await
    }
}

/// Client of the component-builder agent service
#[derive(Debug, Clone)]
pub struct ComponentBuilderClient {
    client: BackendClient,
}

impl ComponentBuilderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_client(BackendClient::new("component-builder", base_url))
    }

    pub fn from_client(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &BackendClient {
        &self.client
    }

    pub async fn stats(&self) -> Result<Option<Value>, BackendError> {
        self.client.get_json(self.client.url(&["api", "stats"], &[])?).await
    }

    pub async fn templates(&self, category: Option<&str>) -> Result<Option<Vec<CatalogTemplate>>, BackendError> {
        let query: Vec<(&str, String)> = category
            .map(|c| vec![("category", c.to_string())])
            .unwrap_or_default();
        self.client
            .get_json(self.client.url(&["api", "templates"], &query)?)
            .await
    }

    pub async fn generated(&self, limit: usize) -> Result<Option<Vec<GeneratedComponent>>, BackendError> {
        let url = self
            .client
            .url(&["api", "generated"], &[("limit", limit.to_string())])?;
        self.client.get_json(url).await
    }
}
