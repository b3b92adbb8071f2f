//! Route registration

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{handlers, middleware::AppState};

/// Upper bound for auth request bodies
const AUTH_BODY_LIMIT: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/confirm-email", get(handlers::confirm::confirm_email));

    let auth_routes = Router::new()
        .route("/api/v1/auth/signup", post(handlers::auth::signup))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .layer(RequestBodyLimitLayer::new(AUTH_BODY_LIMIT));

    // Reachable only after the gate below has attached a SessionUser
    let protected_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/dashboard/{*rest}", get(handlers::dashboard::dashboard));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            crate::auth::middleware::auth_gate_middleware,
        ))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
