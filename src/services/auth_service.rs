//! Account service: signup and login

use crate::{
    auth::{password::PasswordHasher, token::TokenCodec},
    error::AppError,
    models::{
        auth::{LoginRequest, SignupRequest},
        user::{normalize_email, User},
    },
    repository::UserRepository,
    services::confirmation_service::ConfirmationTokenService,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// A user together with a freshly issued session token
#[derive(Debug)]
pub struct SessionGrant {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    codec: Arc<TokenCodec>,
    confirmations: Arc<ConfirmationTokenService>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        codec: Arc<TokenCodec>,
        confirmations: Arc<ConfirmationTokenService>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            codec,
            confirmations,
            hasher,
        }
    }

    /// Register a new account, send its confirmation email and open a session
    #[instrument(skip_all)]
    pub async fn signup(&self, req: SignupRequest) -> Result<SessionGrant, AppError> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let password_hash = self.hasher.hash(&req.password)?;

        let user = self.users.create(&email, &password_hash).await?;
        info!(user_id = %user.id, "User signed up");

        // The account exists from here on; a missing confirmation row must not fail signup
        if let Err(e) = self.confirmations.issue_for(user.id, &user.email).await {
            metrics::counter!("email_confirmation_issue_failures_total").increment(1);
            warn!(user_id = %user.id, error = %e, "Failed to issue confirmation token");
        }

        let token = self.codec.issue(&user).await?;
        metrics::counter!("auth_signups_total").increment(1);

        Ok(SessionGrant { user, token })
    }

    /// Check credentials and open a session. Unknown email and wrong password
    /// are indistinguishable to the caller.
    #[instrument(skip_all)]
    pub async fn login(&self, req: LoginRequest) -> Result<SessionGrant, AppError> {
        let email = normalize_email(&req.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            // same hashing cost as a wrong password
            return Err(self.hasher.verify_missing(&req.password));
        };

        if let Err(e) = self.hasher.verify(&req.password, &user.password_hash) {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            return Err(e);
        }

        let token = self.codec.issue(&user).await?;
        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "User logged in");

        Ok(SessionGrant { user, token })
    }
}
