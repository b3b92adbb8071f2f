//! Session gate middleware

use crate::auth::gate::{AuthGate, GateDecision};
use crate::error::AppError;
use crate::models::user::SessionUser;
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

// Lets handlers behind the gate take `SessionUser` directly
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Gate every request whose path is protected.
///
/// Unprotected paths pass through untouched. Denied requests are redirected
/// to the login path; the reason is never exposed.
pub async fn auth_gate_middleware(
    State(gate): State<Arc<AuthGate>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if !gate.protects(req.uri().path()) {
        return next.run(req).await;
    }

    let token = gate.cookies().get(&jar);

    match gate.authorize(token.as_deref()).await {
        GateDecision::Allow(user) => {
            tracing::debug!(user_id = %user.id, path = %req.uri().path(), "Session accepted");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        GateDecision::Deny {
            redirect_to,
            clear_cookie,
        } => {
            let redirect = Redirect::to(&redirect_to);
            if clear_cookie {
                (gate.cookies().clear(jar), redirect).into_response()
            } else {
                redirect.into_response()
            }
        }
    }
}
