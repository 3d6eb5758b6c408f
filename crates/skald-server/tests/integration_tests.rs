//! Integration tests for the HTTP service

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use skald_consolidator::{Consolidator, EngineConfig};
use skald_server::handlers::{create_router, AppState, ErrorResponse, HealthCheckResponse};
use skald_store::{MemoryStore, SqliteStore};
use tower::ServiceExt; // for oneshot

/// Helper to create a stateful application over SQLite
fn create_test_app() -> Router {
    let config = EngineConfig {
        k: 5,
        stateful: true,
        ..Default::default()
    };
    let store = SqliteStore::new(":memory:").unwrap();
    create_router(AppState::new(Consolidator::new(config, store).unwrap()))
}

fn consolidate_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/consolidate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn majority_body() -> Value {
    json!({
        "objects": [{
            "name": "x",
            "datatype": "categorical",
            "claims": [
                {"sourceId": "s1", "fact": "A"},
                {"sourceId": "s2", "fact": "A"},
                {"sourceId": "s3", "fact": "B"}
            ]
        }]
    })
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app();
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthCheckResponse = serde_json::from_slice(&body).unwrap();

    assert_eq!(health.status, "healthy");
    assert!(health.stateful);
    assert_eq!(health.k, 5);
}

#[tokio::test]
async fn test_consolidate_ranks_claims() {
    let app = create_test_app();
    let response = app.oneshot(consolidate_request(&majority_body())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert!(body["timestamp"].is_string());
    let claims = body["objects"][0]["claims"].as_array().unwrap();
    assert_eq!(claims.len(), 3);
    assert_eq!(claims[0]["fact"], "A");
    assert_eq!(claims[0]["sourceId"], "s1");
    assert_eq!(claims[2]["fact"], "B");
    assert_eq!(claims[0]["confidence"], claims[1]["confidence"]);
    assert!(body["objects"][0].get("error").is_none());

    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 3);
    for source in sources {
        assert_eq!(source["ratings"].as_array().unwrap().len(), 5);
        assert_eq!(source["probabilities"].as_array().unwrap().len(), 5);
        assert!(source["reputation"].is_number());
    }
}

#[tokio::test]
async fn test_stateful_history_and_clear() {
    let app = create_test_app();

    app.clone().oneshot(consolidate_request(&majority_body())).await.unwrap();
    let response = app
        .clone()
        .oneshot(consolidate_request(&majority_body()))
        .await
        .unwrap();
    let body = body_json(response).await;
    let total: u64 = body["sources"][0]["ratings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, 2);

    let response = app.clone().oneshot(get("/clear")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "cleared", "removed": 3}));

    // Second clear is a no-op
    let request = Request::builder()
        .method("DELETE")
        .uri("/sources")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(body_json(response).await, json!({"status": "cleared", "removed": 0}));
}

#[tokio::test]
async fn test_sources_endpoint_lists_stored_sources() {
    let app = create_test_app();

    let response = app.clone().oneshot(get("/sources")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"sources": []}));

    app.clone().oneshot(consolidate_request(&majority_body())).await.unwrap();
    let response = app.oneshot(get("/sources")).await.unwrap();
    let body = body_json(response).await;

    let ids: Vec<&str> = body["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["sourceId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);
    assert_eq!(body["sources"][0]["ratings"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/consolidate")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.kind, "BadRequest");
}

#[tokio::test]
async fn test_malformed_object_is_bad_request() {
    let app = create_test_app();
    let body = json!({"objects": [{"name": "empty", "datatype": "string", "claims": []}]});

    let response = app.oneshot(consolidate_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "MalformedObject");
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_malformed_seed_is_bad_request() {
    let app = create_test_app();
    let body = json!({
        "objects": [],
        "sources": [{"sourceId": "s1", "ratings": [1, 2, 3]}]
    });

    let response = app.oneshot(consolidate_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "MalformedSource");
}

#[tokio::test]
async fn test_incomparable_value_reported_per_object() {
    let app = create_test_app();
    let body = json!({
        "objects": [
            {"name": "height", "datatype": "continuous",
             "claims": [{"sourceId": "s1", "fact": "tall"}, {"sourceId": "s2", "fact": 1.8}]},
            {"name": "color", "datatype": "categorical",
             "claims": [{"sourceId": "s1", "fact": "red"}]}
        ]
    });

    let response = app.oneshot(consolidate_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["objects"][0]["error"]["kind"], "IncomparableValue");
    assert_eq!(body["objects"][0]["claims"], json!([]));
    assert_eq!(body["objects"][1]["claims"][0]["confidence"], 1.0);
}

#[tokio::test]
async fn test_unavailable_ledger_is_service_unavailable() {
    let config = EngineConfig {
        stateful: true,
        ..Default::default()
    };
    let mut store = MemoryStore::new();
    store.take_offline();
    let app = create_router(AppState::new(Consolidator::new(config, store).unwrap()));

    let response = app
        .clone()
        .oneshot(consolidate_request(&majority_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["kind"], "LedgerUnavailable");

    let response = app.oneshot(get("/clear")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_test_app();
    app.clone().oneshot(consolidate_request(&majority_body())).await.unwrap();
    app.clone().oneshot(get("/clear")).await.unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = body_json(response).await;
    assert_eq!(metrics["requests"], 1);
    assert_eq!(metrics["objects_consolidated"], 1);
    assert_eq!(metrics["ratings_recorded"], 3);
    assert_eq!(metrics["clears"], 1);
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skald.toml");
    std::fs::write(
        &path,
        r#"
            bind_port = 8100
            database_path = ":memory:"

            [engine]
            k = 3
            stateful = true
        "#,
    )
    .unwrap();

    let config = skald_server::config::ServerConfig::from_file(&path).unwrap();
    let app = create_router(skald_server::build_state(&config).unwrap());

    let response = app.oneshot(get("/health")).await.unwrap();
    let health = body_json(response).await;
    assert_eq!(health["k"], 3);
    assert_eq!(health["stateful"], true);
}
