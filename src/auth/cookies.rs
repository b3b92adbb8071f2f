//! Session cookie handling

use crate::config::AuthConfig;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        let same_site = match config.cookie_same_site.to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        };

        Self {
            name: config.cookie_name.clone(),
            path: config.cookie_path.clone(),
            secure: config.cookie_secure,
            same_site,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "access-token".to_string(),
            path: "/".to_string(),
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Reads and writes the session token cookie
#[derive(Debug, Clone)]
pub struct SessionCookieStore {
    settings: CookieSettings,
}

impl SessionCookieStore {
    pub fn new(settings: CookieSettings) -> Self {
        Self { settings }
    }

    pub fn set(&self, jar: CookieJar, token: String) -> CookieJar {
        let cookie = Cookie::build((self.settings.name.clone(), token))
            .http_only(true)
            .path(self.settings.path.clone())
            .secure(self.settings.secure)
            .same_site(self.settings.same_site);

        jar.add(cookie)
    }

    /// Current session token, if any. An empty value counts as absent.
    pub fn get(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.settings.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Emit an expired cookie under the same name and path, whether or not
    /// the request carried one
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut removal = Cookie::build((self.settings.name.clone(), ""))
            .http_only(true)
            .path(self.settings.path.clone())
            .build();
        removal.make_removal();

        jar.add(removal)
    }
}
