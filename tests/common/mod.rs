//! Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reporacoon_auth::{
    auth::PasswordHasher,
    config::{
        AppConfig, ApplicationConfig, AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig,
        StorageBackend, StorageConfig,
    },
    middleware::AppState,
    repository::{MemoryStore, Storage},
    services::{
        mailer::{DeliveryInfo, MailerError},
        Mailer, OutgoingEmail,
    },
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Test configuration: in-memory storage and the fixture key pair
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        auth: AuthConfig {
            private_key_path: fixture("jwt_private.pem").display().to_string(),
            public_key_path: fixture("jwt_public.pem").display().to_string(),
            kid: "reporacoon-001".to_string(),
            previous_keys: vec![],
            cookie_name: "access-token".to_string(),
            cookie_path: "/".to_string(),
            cookie_secure: false,
            cookie_same_site: "lax".to_string(),
            login_path: "/login".to_string(),
            protected_paths: vec![
                "/dashboard/:path*".to_string(),
                "/subscription/:path*".to_string(),
            ],
        },
        app: ApplicationConfig {
            base_url: "http://localhost:3000".to_string(),
            mail_from: "no-reply@reporacoon.dev".to_string(),
        },
    }
}

/// Keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Raw confirmation secret from the most recent message
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let html = &sent.last()?.html;
        let start = html.find("token=")? + "token=".len();
        let token: String = html[start..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        Some(token)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryInfo, MailerError> {
        self.sent.lock().unwrap().push(email);
        Ok(DeliveryInfo {
            message_id: "<test@reporacoon>".to_string(),
        })
    }
}

/// Transport that is always down
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<DeliveryInfo, MailerError> {
        Err(MailerError::Unavailable("smtp connection refused".to_string()))
    }
}

pub fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::with_params(1024, 1, 1).unwrap()
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn router(&self) -> axum::Router {
        reporacoon_auth::routes::create_router(self.state.clone())
    }
}

pub fn create_test_app_with_config(config: AppConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState::build(
        &config,
        Storage::from_memory(store.clone()),
        mailer.clone(),
        cheap_hasher(),
    )
    .expect("Failed to build test state");

    TestApp {
        state: Arc::new(state),
        store,
        mailer,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_config(create_test_config())
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values of a response
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// `name=value` of the session cookie set by a response
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with("access-token=") && !c.starts_with("access-token=;"))
        .and_then(|c| c.split(';').next().map(str::to_string))
}

/// Sign arbitrary claims with a fixture key
pub fn sign_claims(claims: &serde_json::Value, key_file: &str, kid: Option<&str>) -> String {
    let pem = std::fs::read(fixture(key_file)).unwrap();
    let key = EncodingKey::from_rsa_pem(&pem).unwrap();

    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &key).unwrap()
}
