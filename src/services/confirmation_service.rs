//! Email confirmation tokens
//!
//! A token is 32 random bytes, hex-encoded, sent to the user in a link. Only
//! its SHA-256 is stored. A token can be redeemed once, within 24 hours.

use crate::{
    error::AppError,
    models::confirmation::{ConfirmOutcome, ConfirmationToken, NewConfirmation},
    repository::ConfirmationRepository,
    services::mailer::{Mailer, OutgoingEmail},
};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

pub const CONFIRMATION_TTL_HOURS: i64 = 24;

const SECRET_BYTES: usize = 32;

/// Why a redemption was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationError {
    InvalidToken,
    AlreadyUsed,
    Expired,
}

impl ConfirmationError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfirmationError::InvalidToken => "invalid_token",
            ConfirmationError::AlreadyUsed => "already_used",
            ConfirmationError::Expired => "expired",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ConfirmationError::InvalidToken => "Invalid confirmation token",
            ConfirmationError::AlreadyUsed => "This confirmation link has already been used",
            ConfirmationError::Expired => "This confirmation link has expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Confirmed { user_id: Uuid },
    Rejected(ConfirmationError),
}

/// Hex-encoded SHA-256 of a raw confirmation secret
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct ConfirmationTokenService {
    confirmations: Arc<dyn ConfirmationRepository>,
    mailer: Arc<dyn Mailer>,
    base_url: Url,
}

impl ConfirmationTokenService {
    pub fn new(
        confirmations: Arc<dyn ConfirmationRepository>,
        mailer: Arc<dyn Mailer>,
        base_url: &str,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid app.base_url: {}", e)))?;

        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "app.base_url {} cannot be used as a base",
                base_url
            )));
        }

        Ok(Self {
            confirmations,
            mailer,
            base_url,
        })
    }

    /// `<base_url>/confirm-email?token=<raw>`
    pub fn confirmation_url(&self, raw: &str) -> String {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("confirm-email");
        }
        url.query_pairs_mut().append_pair("token", raw);
        url.into()
    }

    /// Create a token for `user_id` and mail the link to `email`.
    ///
    /// The row is stored before sending; a mail failure is logged and the
    /// token stays valid.
    #[instrument(skip(self, email))]
    pub async fn issue_for(&self, user_id: Uuid, email: &str) -> Result<ConfirmationToken, AppError> {
        let raw = generate_secret();

        let token = self
            .confirmations
            .create(NewConfirmation {
                user_id,
                token_hash: hash_token(&raw),
                expires_at: Utc::now() + Duration::hours(CONFIRMATION_TTL_HOURS),
            })
            .await?;

        metrics::counter!("email_confirmations_issued_total").increment(1);

        let url = self.confirmation_url(&raw);
        let message = OutgoingEmail {
            to: email.to_string(),
            subject: "Confirm your email".to_string(),
            html: format!(
                "<h2>Welcome!</h2>\n\
                 <p>Click the link below to confirm your email address:</p>\n\
                 <a href=\"{url}\">{url}</a>\n\
                 <p>This link expires in {CONFIRMATION_TTL_HOURS} hours.</p>"
            ),
        };

        match self.mailer.send(message).await {
            Ok(info) => {
                info!(confirmation_id = %token.id, message_id = %info.message_id, "Confirmation email sent")
            }
            Err(e) => {
                metrics::counter!("email_confirmation_mail_failures_total").increment(1);
                warn!(confirmation_id = %token.id, error = %e, "Failed to send confirmation email")
            }
        }

        Ok(token)
    }

    /// Redeem a raw token. Storage failures are the only `Err`.
    #[instrument(skip_all)]
    pub async fn redeem(&self, raw: &str) -> Result<Redemption, AppError> {
        let outcome = self.try_redeem(raw.trim()).await?;

        let label = match &outcome {
            Redemption::Confirmed { .. } => "confirmed",
            Redemption::Rejected(e) => e.code(),
        };
        metrics::counter!("email_confirmations_redeemed_total", "outcome" => label).increment(1);

        Ok(outcome)
    }

    async fn try_redeem(&self, raw: &str) -> Result<Redemption, AppError> {
        if raw.is_empty() {
            return Ok(Redemption::Rejected(ConfirmationError::InvalidToken));
        }

        let Some(token) = self.confirmations.find_by_token_hash(&hash_token(raw)).await? else {
            return Ok(Redemption::Rejected(ConfirmationError::InvalidToken));
        };

        if token.is_used() {
            return Ok(Redemption::Rejected(ConfirmationError::AlreadyUsed));
        }

        let now = Utc::now();
        if token.is_expired_at(now) {
            return Ok(Redemption::Rejected(ConfirmationError::Expired));
        }

        match self.confirmations.confirm(token.id, token.user_id, now).await? {
            ConfirmOutcome::Applied => {
                info!(user_id = %token.user_id, "Email confirmed");
                Ok(Redemption::Confirmed {
                    user_id: token.user_id,
                })
            }
            ConfirmOutcome::AlreadyUsed => Ok(Redemption::Rejected(ConfirmationError::AlreadyUsed)),
        }
    }
}
