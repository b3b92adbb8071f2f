//! Route gate for protected paths
//!
//! Patterns use the same glob grammar as the web frontend's route matcher:
//!
//! - `*` matches one path segment
//! - `**` and `:name*` match zero or more segments
//! - `:name+` matches one or more segments
//! - `:name?` matches zero or one segment
//! - `:name` matches exactly one segment
//!
//! Anything else is literal, except that `*` inside a segment matches any run
//! of characters within that segment.

use crate::auth::cookies::SessionCookieStore;
use crate::auth::token::{TokenCodec, Verification};
use crate::models::user::SessionUser;
use crate::config::AuthConfig;
use percent_encoding::percent_decode_str;
use regex::RegexSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("protected path pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("protected path pattern '{pattern}' has an invalid parameter '{segment}'")]
    InvalidParameter { pattern: String, segment: String },

    #[error("protected path patterns failed to compile: {0}")]
    Compile(#[from] regex::Error),
}

/// Compiled set of protected path patterns
#[derive(Debug, Clone)]
pub struct ProtectedPaths {
    set: RegexSet,
}

impl ProtectedPaths {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let regexes = patterns
            .iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            set: RegexSet::new(regexes)?,
        })
    }

    /// Whether the (raw) request path falls under any pattern.
    ///
    /// Both the path as the router sees it (dot segments kept) and the path
    /// with dot segments resolved are checked; either matching is enough.
    pub fn matches(&self, path: &str) -> bool {
        self.is_match(&clean_path(path)) || self.is_match(&normalize_path(path))
    }

    fn is_match(&self, path: &str) -> bool {
        // patterns are compiled as a run of "/segment" pieces, so the root is the empty run
        let candidate = if path == "/" { "" } else { path };
        self.set.is_match(candidate)
    }
}

fn compile_pattern(pattern: &str) -> Result<String, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::NotAbsolute(pattern.to_string()));
    }

    let mut regex = String::from("^");
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        if segment == "**" {
            regex.push_str("(?:/[^/]+)*");
        } else if segment == "*" {
            regex.push_str("/[^/]+");
        } else if let Some(param) = segment.strip_prefix(':') {
            let (name, piece) = match param.as_bytes().last() {
                Some(b'*') => (&param[..param.len() - 1], "(?:/[^/]+)*"),
                Some(b'+') => (&param[..param.len() - 1], "(?:/[^/]+)+"),
                Some(b'?') => (&param[..param.len() - 1], "(?:/[^/]+)?"),
                _ => (param, "/[^/]+"),
            };
            if !is_param_name(name) {
                return Err(PatternError::InvalidParameter {
                    pattern: pattern.to_string(),
                    segment: segment.to_string(),
                });
            }
            regex.push_str(piece);
        } else {
            regex.push('/');
            let literal: Vec<String> = segment.split('*').map(regex::escape).collect();
            regex.push_str(&literal.join("[^/]*"));
        }
    }
    regex.push('$');

    Ok(regex)
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn decoded_segments(raw: &str) -> Vec<String> {
    let path = raw.split(['?', '#']).next().unwrap_or_default();
    percent_decode_str(path)
        .decode_utf8_lossy()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }

    segments.iter().fold(String::new(), |mut path, segment| {
        path.push('/');
        path.push_str(segment.as_ref());
        path
    })
}

/// Request path with the query and fragment dropped, percent escapes
/// decoded, repeated slashes collapsed and any trailing slash stripped.
/// Dot segments are kept as they are.
pub fn clean_path(raw: &str) -> String {
    join_segments(&decoded_segments(raw))
}

/// [`clean_path`] with `.` and `..` resolved
pub fn normalize_path(raw: &str) -> String {
    let mut resolved: Vec<String> = Vec::new();
    for segment in decoded_segments(raw) {
        match segment.as_str() {
            "." => {}
            ".." => {
                resolved.pop();
            }
            _ => resolved.push(segment),
        }
    }
    join_segments(&resolved)
}

/// Outcome of checking a request against the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow(SessionUser),
    Deny {
        redirect_to: String,
        /// The presented cookie is unusable and should be removed
        clear_cookie: bool,
    },
}

/// Decides whether a request to a protected path may proceed
pub struct AuthGate {
    paths: ProtectedPaths,
    codec: Arc<TokenCodec>,
    cookies: SessionCookieStore,
    login_path: String,
}

impl AuthGate {
    pub fn new(
        paths: ProtectedPaths,
        codec: Arc<TokenCodec>,
        cookies: SessionCookieStore,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            paths,
            codec,
            cookies,
            login_path: login_path.into(),
        }
    }

    pub fn from_config(
        config: &AuthConfig,
        codec: Arc<TokenCodec>,
        cookies: SessionCookieStore,
    ) -> Result<Self, PatternError> {
        let paths = ProtectedPaths::new(&config.protected_paths)?;
        Ok(Self::new(paths, codec, cookies, config.login_path.clone()))
    }

    pub fn protects(&self, path: &str) -> bool {
        self.paths.matches(path)
    }

    pub fn cookies(&self) -> &SessionCookieStore {
        &self.cookies
    }

    pub async fn authorize(&self, token: Option<&str>) -> GateDecision {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return self.deny("no_token", false);
        };

        match self.codec.verify(token).await {
            Ok(Verification::Valid(claims)) => GateDecision::Allow(claims.into_user()),
            Ok(Verification::Invalid(reason)) => self.deny(reason.as_str(), true),
            Err(e) => {
                tracing::error!(error = %e, "Session check failed: signing keys unavailable");
                self.deny("keys_unavailable", false)
            }
        }
    }

    fn deny(&self, reason: &'static str, clear_cookie: bool) -> GateDecision {
        tracing::debug!(reason, clear_cookie, "Session rejected");
        metrics::counter!("auth_gate_denied_total", "reason" => reason).increment(1);

        GateDecision::Deny {
            redirect_to: self.login_path.clone(),
            clear_cookie,
        }
    }
}
