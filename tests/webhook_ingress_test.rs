//! Transport-level webhook ingress behavior: auth, parse, topic routing.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sampleledger::api::signature::sign_payload;
use sampleledger::api::{self, AppState};
use sampleledger::config::Config;
use sampleledger::db::init_db;
use sampleledger::domain::Money;
use sampleledger::platform::MockCommercePlatform;
use sampleledger::Repository;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

const SECRET: &str = "shhh-brand-secret";

async fn setup_test_app() -> (axum::Router, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    repo.insert_brand(
        "Acme",
        "acme.example.com",
        SECRET,
        30,
        Money::from_str("10").unwrap(),
        Money::zero(),
        Money::zero(),
    )
    .await
    .unwrap();

    let config = Config {
        port: 0,
        database_path: db_path,
        platform_api_url: "http://example.invalid".to_string(),
        tag_lookup_timeout_ms: 100,
    };

    let state = AppState::new(repo.clone(), config, Arc::new(MockCommercePlatform::new()));
    (api::create_router(state), repo, temp_dir)
}

fn webhook_request(domain: &str, topic: &str, body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/orders")
        .header("x-platform-shop-domain", domain)
        .header("x-platform-topic", topic)
        .header("x-platform-hmac-sha256", signature)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_headers_rejected() {
    let (app, _repo, _temp) = setup_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/orders")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_shop_domain_rejected() {
    let (app, _repo, _temp) = setup_test_app().await;

    let body = r#"{"id":"1"}"#;
    let signature = sign_payload(body.as_bytes(), SECRET);
    let response = app
        .oneshot(webhook_request(
            "unknown.example.com",
            "orders/paid",
            body,
            &signature,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_signature_rejected_without_side_effects() {
    let (app, repo, _temp) = setup_test_app().await;

    let body = r#"{"id":"order-1","total_price":"50.00"}"#;
    let signature = sign_payload(b"different payload", SECRET);
    let response = app
        .oneshot(webhook_request(
            "acme.example.com",
            "orders/paid",
            body,
            &signature,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was processed or audited as business activity.
    let events = repo.list_processed_events_for_order("order-1").await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let (app, _repo, _temp) = setup_test_app().await;

    let body = "not json";
    let signature = sign_payload(body.as_bytes(), SECRET);
    let response = app
        .oneshot(webhook_request(
            "acme.example.com",
            "orders/paid",
            body,
            &signature,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_topic_acknowledged_and_audited() {
    let (app, repo, _temp) = setup_test_app().await;

    let body = r#"{"id":"order-2"}"#;
    let signature = sign_payload(body.as_bytes(), SECRET);
    let response = app
        .oneshot(webhook_request(
            "acme.example.com",
            "refunds/create",
            body,
            &signature,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ignored");

    let events = repo.list_processed_events_for_order("order-2").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, "ignored");
}

#[tokio::test]
async fn test_untracked_customer_returns_success() {
    let (app, repo, _temp) = setup_test_app().await;

    let body = serde_json::json!({
        "id": "order-3",
        "total_price": "42.00",
        "customer": {"id": "555", "email": "stranger@example.com"}
    })
    .to_string();
    let signature = sign_payload(body.as_bytes(), SECRET);
    let response = app
        .oneshot(webhook_request(
            "acme.example.com",
            "orders/paid",
            &body,
            &signature,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "customer_not_tracked");

    let events = repo.list_processed_events_for_order("order-3").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, "customer_not_tracked");
    assert_eq!(events[0].customer_id, None);
}
