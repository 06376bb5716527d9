//! Supabase (PostgREST) client for the `templates` table
//!
//! Two client flavours exist: the server client, which prefers the
//! service-role key, and the browser client, which may only use the anon key.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, TemplateStoreError};
use crate::templates::{RowId, Template, TemplateRepository};

pub const TEMPLATES_TABLE: &str = "templates";

/// Supabase connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
}

impl SupabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through a variable lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            url: get("SUPABASE_URL"),
            anon_key: get("SUPABASE_ANON_KEY"),
            service_role_key: get("SUPABASE_SERVICE_ROLE_KEY"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && (self.service_role_key.is_some() || self.anon_key.is_some())
    }
}

fn require<'a>(name: &str, value: Option<&'a String>) -> Result<&'a String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
}

/// Which key a client authenticates with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    /// Service-role key if available, anon key otherwise
    Server,
    /// Anon key only
    Browser,
}

/// Build the privileged client used by server-side reads and writes
pub fn create_server_client(config: &SupabaseConfig) -> Result<SupabaseClient, ConfigError> {
    let url = require("SUPABASE_URL", config.url.as_ref())?;
    let key = require(
        "SUPABASE_SERVICE_ROLE_KEY or SUPABASE_ANON_KEY",
        config.service_role_key.as_ref().or(config.anon_key.as_ref()),
    )?;
    Ok(SupabaseClient::new(url, key, ClientRole::Server))
}

/// Build the unprivileged client handed to browsers
pub fn create_browser_client(config: &SupabaseConfig) -> Result<SupabaseClient, ConfigError> {
    let url = require("SUPABASE_URL", config.url.as_ref())?;
    let key = require("SUPABASE_ANON_KEY", config.anon_key.as_ref())?;
    Ok(SupabaseClient::new(url, key, ClientRole::Browser))
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: RowId,
}

/// Thin PostgREST client
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
    key: String,
    role: ClientRole,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.rest_url)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    fn new(url: &str, key: &str, role: ClientRole) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
            role,
        }
    }

    pub fn role(&self) -> ClientRole {
        self.role
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn auth_headers(&self) -> Result<HeaderMap, TemplateStoreError> {
        let invalid = |_| TemplateStoreError::Backend("Supabase key is not a valid header value".to_string());
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.key)).map_err(invalid)?,
        );
        Ok(headers)
    }

    /// Turn a non-2xx response into the backend's own message
    async fn check(response: Response) -> Result<Response, TemplateStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<PostgrestError>(&body)
            .ok()
            .and_then(|e| e.message)
            .or_else(|| (!body.trim().is_empty()).then(|| body.clone()))
            .unwrap_or_else(|| status_message(status));

        warn!("Supabase request failed ({}): {}", status, message);
        Err(TemplateStoreError::Backend(message))
    }
}

fn status_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

#[async_trait]
impl TemplateRepository for SupabaseClient {
    async fn list_templates(&self) -> Result<Vec<Template>, TemplateStoreError> {
        let response = self
            .http
            .get(self.table_url(TEMPLATES_TABLE))
            .headers(self.auth_headers()?)
            .query(&[("select", "*"), ("order", "updated_at.desc")])
            .send()
            .await?;

        let templates: Vec<Template> = Self::check(response).await?.json().await?;
        debug!("Loaded {} templates", templates.len());
        Ok(templates)
    }

    async fn upsert_template(&self, template: &Template) -> Result<String, TemplateStoreError> {
        let response = self
            .http
            .post(self.table_url(TEMPLATES_TABLE))
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/vnd.pgrst.object+json")
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("select", "id")])
            .json(template)
            .send()
            .await?;

        let row: IdRow = Self::check(response).await?.json().await?;
        let id = String::from(row.id);
        debug!("Upserted template: {}", id);
        Ok(id)
    }

    async fn delete_template(&self, id: &str) -> Result<(), TemplateStoreError> {
        let response = self
            .http
            .delete(self.table_url(TEMPLATES_TABLE))
            .headers(self.auth_headers()?)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;

        Self::check(response).await?;
        debug!("Deleted template: {}", id);
        Ok(())
    }
}
