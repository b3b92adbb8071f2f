//! Signup, login and logout API tests

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, get_request, json_request, session_cookie, set_cookies};

const PASSWORD: &str = "trash-panda-42";

async fn signup(app: &common::TestApp, email: &str) -> axum::response::Response {
    app.router()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({ "email": email, "password": PASSWORD }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_signup_success() {
    let app = create_test_app();

    let response = signup(&app, "Raccoon@Example.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookies = set_cookies(&response);
    let cookie = cookies
        .iter()
        .find(|c| c.starts_with("access-token="))
        .expect("session cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("SameSite=Lax"));

    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "raccoon@example.com");
    assert_eq!(json["user"]["email_confirmed"], false);
    assert_eq!(json["expires_in"], 3600);
    assert!(json["user"].get("password_hash").is_none());

    // One confirmation mail carrying the link
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "raccoon@example.com");
    assert!(sent[0].html.contains("http://localhost:3000/confirm-email?token="));
}

#[tokio::test]
async fn test_signup_duplicate_email_conflicts() {
    let app = create_test_app();

    assert_eq!(signup(&app, "raccoon@example.com").await.status(), StatusCode::CREATED);

    let response = signup(&app, "RACCOON@example.com").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], 409);
}

#[tokio::test]
async fn test_signup_rejects_invalid_input() {
    let app = create_test_app();

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({ "email": "not-an-email", "password": "short" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn test_login_success() {
    let app = create_test_app();
    signup(&app, "raccoon@example.com").await;

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "email": "raccoon@example.com", "password": PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_some());

    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "raccoon@example.com");
    assert!(json["expires_in"].is_number());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = create_test_app();
    signup(&app, "raccoon@example.com").await;

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "email": "raccoon@example.com", "password": "WrongPassword" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());

    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_unknown_email_looks_like_wrong_password() {
    let app = create_test_app();

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_session_cookie_opens_dashboard_and_logout_clears_it() {
    let app = create_test_app();
    let response = signup(&app, "raccoon@example.com").await;
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .router()
        .oneshot(get_request("/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["email"], "raccoon@example.com");
    assert_eq!(json["email_confirmed"], false);

    let response = app
        .router()
        .oneshot(json_request("POST", "/api/v1/auth/logout", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cleared = set_cookies(&response);
    assert!(cleared
        .iter()
        .any(|c| c.starts_with("access-token=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_response_carries_tracking_headers() {
    let app = create_test_app();

    let response = app
        .router()
        .oneshot(
            axum::http::Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-abc")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-trace-id"], "trace-abc");
    assert!(response.headers().contains_key("x-request-id"));
}
