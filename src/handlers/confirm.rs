//! Email confirmation link target

use crate::{
    error::{AppError, ErrorResponse},
    middleware::AppState,
    models::auth::{ConfirmEmailQuery, ConfirmEmailResponse},
    services::confirmation_service::{ConfirmationError, Redemption},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

pub async fn confirm_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfirmEmailQuery>,
) -> Result<Response, AppError> {
    let raw = query.token.unwrap_or_default();

    match state.confirmation_service.redeem(&raw).await? {
        Redemption::Confirmed { .. } => {
            Ok(Json(ConfirmEmailResponse { status: "confirmed" }).into_response())
        }
        Redemption::Rejected(reason) => Ok(rejection(reason)),
    }
}

fn rejection(reason: ConfirmationError) -> Response {
    tracing::debug!(reason = reason.code(), "Confirmation rejected");

    ErrorResponse::new(StatusCode::BAD_REQUEST, reason.user_message()).into_response()
}
