//! Configuration
//! Loads every setting from defaults plus `REPORACOON_` environment variables.
//! Sensitive values are wrapped in `Secret`.

use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;
use url::Url;

use crate::auth::gate::ProtectedPaths;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:3000"
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, required for the postgres backend
    #[serde(default)]
    pub url: Option<Secret<String>>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, for tests and local development
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// json, pretty, compact
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// PKCS#8 (or PKCS#1) PEM file holding the RS256 signing key
    pub private_key_path: String,
    /// SPKI PEM file holding the matching verification key
    pub public_key_path: String,
    /// Key identifier written into every token header
    pub kid: String,
    /// Verification-only keys of earlier generations, as `kid=path`
    #[serde(default)]
    pub previous_keys: Vec<String>,
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_secure: bool,
    /// strict, lax, none
    pub cookie_same_site: String,
    /// Where denied requests are redirected
    pub login_path: String,
    /// Glob patterns gated by the session check
    pub protected_paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    /// Public base URL used to build confirmation links
    pub base_url: String,
    /// Sender address for outgoing mail
    pub mail_from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub app: ApplicationConfig,
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("storage.backend", "postgres")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("auth.private_key_path", "keys/jwt_private.pem")?
            .set_default("auth.public_key_path", "keys/jwt_public.pem")?
            .set_default("auth.kid", "reporacoon-001")?
            .set_default("auth.previous_keys", Vec::<String>::new())?
            .set_default("auth.cookie_name", "access-token")?
            .set_default("auth.cookie_path", "/")?
            .set_default("auth.cookie_secure", false)?
            .set_default("auth.cookie_same_site", "lax")?
            .set_default("auth.login_path", "/login")?
            .set_default("auth.protected_paths", vec!["/dashboard/:path*", "/subscription/:path*"])?
            .set_default("app.base_url", "http://localhost:3000")?
            .set_default("app.mail_from", "\"Reporacoon\" <no-reply@reporacoon.dev>")?;

        // REPORACOON_AUTH__KID=... ; lists are comma separated
        settings = settings.add_source(
            Environment::with_prefix("REPORACOON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("auth.protected_paths")
                .with_list_parse_key("auth.previous_keys"),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                // port 0 asks the OS for a free port
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty, compact",
                    self.logging.format
                )))
            }
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url is required when storage.backend is postgres".to_string(),
            ));
        }

        if self.auth.private_key_path.trim().is_empty() || self.auth.public_key_path.trim().is_empty()
        {
            return Err(ConfigError::Message("Key paths must not be empty".to_string()));
        }

        if self.auth.kid.trim().is_empty() {
            return Err(ConfigError::Message("auth.kid must not be empty".to_string()));
        }

        for entry in &self.auth.previous_keys {
            match entry.split_once('=') {
                Some((kid, path)) if !kid.trim().is_empty() && !path.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::Message(format!(
                        "Invalid previous key entry '{}', expected kid=path",
                        entry
                    )))
                }
            }
        }

        match self.auth.cookie_same_site.to_lowercase().as_str() {
            "strict" | "lax" | "none" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "Invalid cookie_same_site: {}. Must be one of: strict, lax, none",
                    other
                )))
            }
        }

        if !self.auth.cookie_path.starts_with('/') {
            return Err(ConfigError::Message("auth.cookie_path must start with '/'".to_string()));
        }

        if !self.auth.login_path.starts_with('/') {
            return Err(ConfigError::Message("auth.login_path must start with '/'".to_string()));
        }

        let protected = ProtectedPaths::new(&self.auth.protected_paths)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        // a gated login page would redirect to itself forever
        if protected.matches(&self.auth.login_path) {
            return Err(ConfigError::Message(format!(
                "auth.login_path {} is covered by a protected pattern",
                self.auth.login_path
            )));
        }

        Url::parse(&self.app.base_url)
            .map_err(|e| ConfigError::Message(format!("Invalid app.base_url: {}", e)))?;

        Ok(())
    }
}
