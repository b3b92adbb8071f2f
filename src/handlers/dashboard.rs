//! Protected area

use crate::models::user::SessionUser;
use axum::Json;

/// Echo the signed-in user; only reachable through the session gate
pub async fn dashboard(user: SessionUser) -> Json<SessionUser> {
    Json(user)
}
