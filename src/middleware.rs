//! Application state and request tracking middleware

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{
        cookies::{CookieSettings, SessionCookieStore},
        gate::AuthGate,
        keys::KeyProvider,
        password::PasswordHasher,
        token::TokenCodec,
    },
    config::AppConfig,
    error::AppError,
    repository::Storage,
    services::{AuthService, ConfirmationTokenService, Mailer},
};

/// Shared application state. Every service is behind an `Arc` so cloning the
/// state per request is a handful of pointer copies.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub keys: Arc<KeyProvider>,
    pub cookies: SessionCookieStore,
    pub gate: Arc<AuthGate>,
    pub auth_service: Arc<AuthService>,
    pub confirmation_service: Arc<ConfirmationTokenService>,
}

impl AppState {
    /// Wire services together. Keys are not loaded here; call
    /// `state.keys.keys()` to warm them up.
    pub fn build(
        config: &AppConfig,
        storage: Storage,
        mailer: Arc<dyn Mailer>,
        hasher: PasswordHasher,
    ) -> Result<Self, AppError> {
        let keys = Arc::new(KeyProvider::from_config(&config.auth));
        let codec = Arc::new(TokenCodec::new(keys.clone()));
        let cookies = SessionCookieStore::new(CookieSettings::from_config(&config.auth));

        let gate = Arc::new(
            AuthGate::from_config(&config.auth, codec.clone(), cookies.clone())
                .map_err(|e| AppError::Config(e.to_string()))?,
        );

        let confirmation_service = Arc::new(ConfirmationTokenService::new(
            storage.confirmations.clone(),
            mailer,
            &config.app.base_url,
        )?);

        let auth_service = Arc::new(AuthService::new(
            storage.users.clone(),
            codec.clone(),
            confirmation_service.clone(),
            hasher,
        ));

        Ok(Self {
            storage,
            keys,
            cookies,
            gate,
            auth_service,
            confirmation_service,
        })
    }
}

/// Request tracking: trace/request ids, a span, a log line and metrics per request
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    // path only; query strings may carry confirmation secrets
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            303 => "303",
            400 => "400",
            401 => "401",
            404 => "404",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
