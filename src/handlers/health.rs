//! Liveness and readiness probes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::{db, middleware::AppState};

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record process start; later calls are no-ops
pub fn set_start_time() {
    START_TIME.get_or_init(Instant::now);
}

pub fn get_uptime() -> u64 {
    START_TIME.get().map_or(0, |start| start.elapsed().as_secs())
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "healthy".to_string(),
            message: None,
        }
    }

    fn unhealthy(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: "unhealthy".to_string(),
            message: Some(message),
        }
    }
}

/// Liveness: answers without touching dependencies
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
    })
}

/// Readiness: storage reachable and signing keys loaded
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut checks = Vec::new();

    match &state.storage.pool {
        Some(pool) => {
            db::record_pool_metrics(pool);
            checks.push(match db::health_check(pool).await {
                db::HealthStatus::Healthy => HealthCheck::healthy("database"),
                db::HealthStatus::Unhealthy(msg) => HealthCheck::unhealthy("database", msg),
            });
        }
        None => checks.push(HealthCheck::healthy(state.storage.backend_name())),
    }

    checks.push(match state.keys.keys().await {
        Ok(_) => HealthCheck::healthy("signing_keys"),
        Err(_) => HealthCheck::unhealthy("signing_keys", "key material unavailable".to_string()),
    });

    let ready = checks.iter().all(|c| c.status == "healthy");
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}
