//! Backend clients and cached producers against a mock HTTP server

use agentdeck::backend::{AgentStatus, ComponentBuilderClient, OrchestratorClient};
use agentdeck::producers::{Producers, DEFAULT_GENERATED_LIMIT};
use agentdeck_cache::{CacheConfig, TagCache};
use mockito::{Matcher, Server};
use serde_json::json;

fn producers(orchestrator_url: &str, builder_url: &str) -> Producers {
    Producers::new(
        TagCache::new(CacheConfig::default()),
        OrchestratorClient::new(orchestrator_url),
        ComponentBuilderClient::new(builder_url),
    )
}

#[tokio::test]
async fn test_get_json_outcomes() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("GET", "/api/status")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "uptime": 5000,
                "activeAgents": ["component-builder"],
                "tasksCompleted": 7,
                "lastUpdated": "2025-03-01T12:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/api/metrics")
        .with_status(503)
        .create_async()
        .await;

    let client = OrchestratorClient::new(server.url());

    let status = client.status().await.unwrap().unwrap();
    assert_eq!(status.tasks_completed, 7);
    ok.assert_async().await;

    assert!(client.metrics().await.unwrap().is_none());

    let offline = OrchestratorClient::new("http://127.0.0.1:9");
    assert!(offline.status().await.is_err());
}

#[tokio::test]
async fn test_agent_stats_aggregates_both_services() {
    let mut orchestrator = Server::new_async().await;
    let mut builder = Server::new_async().await;

    let orchestrator_stats = orchestrator
        .mock("GET", "/api/stats")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "requests": 12, "status": "online" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let builder_stats = builder
        .mock("GET", "/api/stats")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let producers = producers(&orchestrator.url(), &builder.url());

    let report = producers.agent_stats().await.unwrap();
    assert_eq!(report.orchestrator.0, json!({ "requests": 12, "status": "online" }));
    assert!(report.component_builder.is_offline());
    assert_eq!(report.cache_info.revalidates_in, "5 minutes");
    assert_eq!(report.cache_info.expires_in, "1 hour");

    // Served from cache
    let again = producers.agent_stats().await.unwrap();
    assert_eq!(again, report);

    orchestrator_stats.assert_async().await;
    builder_stats.assert_async().await;
}

#[tokio::test]
async fn test_agent_stats_wire_shape() {
    let producers = producers("http://127.0.0.1:9", "http://127.0.0.1:9");
    let value = serde_json::to_value(producers.agent_stats().await.unwrap()).unwrap();

    assert!(value["timestamp"].is_string());
    assert_eq!(
        value["orchestrator"],
        json!({ "status": "offline", "error": "Failed to connect" })
    );
    assert_eq!(
        value["componentBuilder"],
        json!({ "status": "offline", "error": "Failed to connect" })
    );
    assert_eq!(
        value["cacheInfo"],
        json!({ "profile": "agents", "revalidatesIn": "5 minutes", "expiresIn": "1 hour" })
    );
}

#[tokio::test]
async fn test_capabilities_fallback_on_non_success() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/agents/component-builder/capabilities")
        .with_status(404)
        .create_async()
        .await;

    let producers = producers(&server.url(), "http://127.0.0.1:9");
    let caps = producers.agent_capabilities("component-builder").await.unwrap();

    assert_eq!(caps.name, "component-builder");
    assert!(caps.capabilities.is_empty());
    assert_eq!(caps.status, AgentStatus::Offline);
    assert_eq!(caps.version, "unknown");
}

#[tokio::test]
async fn test_malformed_body_falls_back() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/actions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{ not json")
        .create_async()
        .await;

    let producers = producers(&server.url(), "http://127.0.0.1:9");
    assert!(producers.available_actions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_query_parameters() {
    let mut server = Server::new_async().await;
    let forms = server
        .mock("GET", "/api/templates")
        .match_query(Matcher::UrlEncoded("category".into(), "forms".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{
                "id": "t1",
                "name": "Login form",
                "category": "forms",
                "preview": "login.png",
                "code": "<LoginForm />"
            }])
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let generated = server
        .mock("GET", "/api/generated")
        .match_query(Matcher::UrlEncoded("limit".into(), "10".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{
                "id": "g1",
                "name": "PricingTable",
                "code": "export function PricingTable() {}",
                "generatedAt": "2025-03-01T12:00:00Z",
                "agent": "component-builder"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let producers = producers("http://127.0.0.1:9", &server.url());

    let templates = producers.catalog_templates(Some("forms")).await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].category, "forms");
    // Cached per category
    producers.catalog_templates(Some("forms")).await.unwrap();
    forms.assert_async().await;

    let components = producers
        .generated_components(DEFAULT_GENERATED_LIMIT)
        .await
        .unwrap();
    assert_eq!(components[0].agent, "component-builder");
    generated.assert_async().await;
}

#[tokio::test]
async fn test_revalidated_status_refreshes_in_background() {
    let mut server = Server::new_async().await;
    let status = server
        .mock("GET", "/api/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "uptime": 1,
                "activeAgents": [],
                "tasksCompleted": 1,
                "lastUpdated": "2025-03-01T12:00:00Z"
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let producers = producers(&server.url(), "http://127.0.0.1:9");
    producers.orchestrator_status().await.unwrap();

    let actions = agentdeck::CacheActions::new(std::sync::Arc::new(producers.cache().clone()));
    actions.revalidate_orchestrator_status().await.unwrap();

    // Stale value served, one refresh started
    producers.orchestrator_status().await.unwrap();
    producers.orchestrator_status().await.unwrap();
    producers.cache().flush_refreshes().await;

    status.assert_async().await;
}
