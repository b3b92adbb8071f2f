//! Signup, login and logout

use crate::{
    auth::token::SESSION_TTL_SECS,
    error::AppError,
    middleware::AppState,
    models::{
        auth::{AuthResponse, LoginRequest, SignupRequest},
        user::UserResponse,
    },
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Create an account and start a session
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.auth_service.signup(req).await?;

    let jar = state.cookies.set(jar, grant.token);
    let body = AuthResponse {
        user: UserResponse::from(grant.user),
        expires_in: SESSION_TTL_SECS,
    };

    Ok((StatusCode::CREATED, jar, Json(body)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.auth_service.login(req).await?;

    let jar = state.cookies.set(jar, grant.token);
    let body = AuthResponse {
        user: UserResponse::from(grant.user),
        expires_in: SESSION_TTL_SECS,
    };

    Ok((jar, Json(body)))
}

/// Drop the session cookie. Tokens are stateless, so there is nothing to revoke.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, state.cookies.clear(jar))
}
