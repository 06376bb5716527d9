//! API routes for the agentdeck gateway

use std::sync::Arc;

use agentdeck_cache::{profile, CacheStats, InvalidationEvent, RevalidateProfile, TagCache};
use axum::{
    extract::{Path, Query, State},
    http::{header::CACHE_CONTROL, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::actions::CacheActions;
use crate::backend::{BackendClient, ComponentBuilderClient, CopilotAction, OrchestratorClient};
use crate::config::{AppConfig, CopilotConfig};
use crate::error::{ApiError, ConfigError};
use crate::events::{action_definitions, AgentEvent, AgentEvents, EventLog, RecordedEvent};
use crate::feed::ChangeFeed;
use crate::producers::{Producers, DEFAULT_GENERATED_LIMIT};
use crate::supabase::create_server_client;
use crate::templates::{Template, TemplateStore, WriteAck};

/// Application state
pub struct AppState {
    pub cache: TagCache,
    pub producers: Producers,
    pub actions: CacheActions,
    /// Unavailable when Supabase is not configured; the error names the missing variable
    pub templates: Result<TemplateStore, ConfigError>,
    pub events: AgentEvents,
    pub copilot: CopilotConfig,
}

impl AppState {
    pub fn new(
        cache: TagCache,
        producers: Producers,
        templates: Result<TemplateStore, ConfigError>,
        copilot: CopilotConfig,
    ) -> Self {
        let actions = CacheActions::new(Arc::new(cache.clone()));
        Self {
            events: AgentEvents::with_log(
                actions.clone(),
                EventLog::with_capacity(copilot.event_log_capacity),
            ),
            cache,
            producers,
            actions,
            templates,
            copilot,
        }
    }

    /// Wire clients, store and cache from configuration
    pub fn from_config(config: &AppConfig, cache: TagCache, feed: ChangeFeed) -> Self {
        let http = reqwest::Client::new();
        let producers = Producers::new(
            cache.clone(),
            OrchestratorClient::from_client(BackendClient::with_client(
                http.clone(),
                "orchestrator",
                config.orchestrator_url.clone(),
            )),
            ComponentBuilderClient::from_client(BackendClient::with_client(
                http,
                "component-builder",
                config.component_builder_url.clone(),
            )),
        );

        let templates = create_server_client(&config.supabase)
            .map(|client| TemplateStore::new(Arc::new(client), cache.clone(), feed));
        if let Err(e) = &templates {
            warn!("Template store unavailable: {}", e);
        }

        Self::new(cache, producers, templates, config.copilot.clone())
    }

    fn template_store(&self) -> Result<&TemplateStore, ApiError> {
        self.templates
            .as_ref()
            .map_err(|e| ApiError::Config(e.clone()))
    }

    /// JSON response carrying the `Cache-Control` header of `profile_name`
    fn cached<T: Serialize>(&self, profile_name: &str, body: T) -> Response {
        let mut response = Json(body).into_response();
        if let Some(value) = self
            .cache
            .profile(profile_name)
            .ok()
            .and_then(|p| HeaderValue::from_str(&p.cache_control()).ok())
        {
            response.headers_mut().insert(CACHE_CONTROL, value);
        }
        response
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Category filter for the builder catalog
#[derive(Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct GeneratedQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowResponse {
    pub model: String,
    pub context_window: u32,
}

/// Body of `POST /api/cache/revalidate`
#[derive(Deserialize)]
pub struct RevalidateRequest {
    pub tag: String,
    pub profile: RevalidateProfile,
}

/// Body of `POST /api/cache/update`
#[derive(Deserialize)]
pub struct UpdateRequest {
    pub tag: String,
}

/// Chat runtime descriptor
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub agent: String,
    pub runtime_url: String,
    pub actions: Vec<CopilotAction>,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Aggregated stats of both backend services
pub async fn agent_stats(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.producers.agent_stats().await {
        Ok(report) => Ok(state.cached(profile::AGENTS, report)),
        Err(e) => {
            error!("Error fetching agent stats: {}", e);
            Err(ApiError::Internal("Failed to fetch agent statistics".to_string()))
        }
    }
}

pub async fn orchestrator_status(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let status = state.producers.orchestrator_status().await?;
    Ok(state.cached(profile::AGENTS, status))
}

pub async fn orchestrator_metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let metrics = state.producers.orchestrator_metrics().await?;
    Ok(state.cached(profile::AGENTS, metrics))
}

pub async fn agent_capabilities(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let capabilities = state.producers.agent_capabilities(&name).await?;
    Ok(state.cached(profile::AGENTS, capabilities))
}

pub async fn available_actions(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let actions = state.producers.available_actions().await?;
    Ok(state.cached(profile::HOURS, actions))
}

pub async fn catalog_templates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CatalogQuery>,
) -> Result<Response, ApiError> {
    let category = params.category.as_deref().filter(|c| !c.is_empty());
    let templates = state.producers.catalog_templates(category).await?;
    Ok(state.cached(profile::HOURS, templates))
}

pub async fn generated_components(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeneratedQuery>,
) -> Result<Response, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_GENERATED_LIMIT);
    let components = state.producers.generated_components(limit).await?;
    Ok(state.cached(profile::MINUTES, components))
}

pub async fn context_window(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
) -> Result<Response, ApiError> {
    let context_window = state.producers.llm_context_window(&model).await?;
    Ok(state.cached(
        profile::DAYS,
        ContextWindowResponse {
            model,
            context_window,
        },
    ))
}

pub async fn list_templates(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let templates = state.template_store()?.component_templates().await?;
    Ok(state.cached(profile::HOURS, templates))
}

pub async fn upsert_template(
    State(state): State<Arc<AppState>>,
    Json(template): Json<Template>,
) -> Result<Json<WriteAck>, ApiError> {
    if template.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Template name must not be empty".to_string()));
    }
    let ack = state
        .template_store()?
        .upsert_component_template(template)
        .await?;
    Ok(Json(ack))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WriteAck>, ApiError> {
    let ack = state.template_store()?.delete_component_template(&id).await?;
    Ok(Json(ack))
}

pub async fn revalidate_tag(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RevalidateRequest>,
) -> Result<Json<InvalidationEvent>, ApiError> {
    let event = state
        .actions
        .revalidate_by_tag(request.tag, request.profile)
        .await?;
    Ok(Json(event))
}

pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<InvalidationEvent>, ApiError> {
    let event = state.actions.update_by_tag(request.tag).await?;
    Ok(Json(event))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

pub async fn runtime_info(State(state): State<Arc<AppState>>) -> Json<RuntimeInfo> {
    Json(RuntimeInfo {
        agent: state.copilot.agent.clone(),
        runtime_url: state.copilot.runtime_url.clone(),
        actions: action_definitions(),
    })
}

pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AgentEvent>,
) -> Result<(StatusCode, Json<RecordedEvent>), ApiError> {
    let recorded = state.events.receive(event).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<RecordedEvent>> {
    Json(state.events.log().all().await)
}
