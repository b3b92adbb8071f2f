//! Health and readiness API tests

use axum::http::StatusCode;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, get_request};

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.router().oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_ready_endpoint_with_memory_storage() {
    let app = create_test_app();

    let response = app.router().oneshot(get_request("/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ready"], true);

    let checks = json["checks"].as_array().unwrap();
    assert!(checks.iter().any(|c| c["name"] == "memory" && c["status"] == "healthy"));
    assert!(checks.iter().any(|c| c["name"] == "signing_keys" && c["status"] == "healthy"));
}

#[tokio::test]
async fn test_ready_endpoint_reports_missing_keys() {
    let mut config = common::create_test_config();
    config.auth.private_key_path = common::fixture("does_not_exist.pem").display().to_string();
    let app = common::create_test_app_with_config(config);

    let response = app.router().oneshot(get_request("/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
}
