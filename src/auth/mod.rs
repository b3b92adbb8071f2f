//! Session authentication: keys, tokens, cookies and the route gate

pub mod cookies;
pub mod gate;
pub mod keys;
pub mod middleware;
pub mod password;
pub mod token;

pub use cookies::{CookieSettings, SessionCookieStore};
pub use gate::{AuthGate, GateDecision, ProtectedPaths};
pub use keys::{KeyLoadError, KeyProvider, KeyRing, KeySettings};
pub use crate::models::user::SessionUser;
pub use middleware::auth_gate_middleware;
pub use password::PasswordHasher;
pub use token::{SessionClaims, TokenCodec, Verification, VerificationError};
