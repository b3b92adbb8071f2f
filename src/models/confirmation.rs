//! Email confirmation records

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored confirmation token. Only the SHA-256 hash of the secret is kept.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfirmationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Hex-encoded SHA-256 of the raw secret
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, when the token is redeemed
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConfirmationToken {
    pub fn is_used(&self) -> bool {
        self.confirmed_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewConfirmation {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of the atomic redeem step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This call marked the token used and confirmed the user
    Applied,
    /// Another redemption got there first
    AlreadyUsed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let token = ConfirmationToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "ab".repeat(32),
            expires_at: now,
            confirmed_at: None,
            created_at: now - Duration::hours(24),
        };

        assert!(token.is_expired_at(now));
        assert!(!token.is_expired_at(now - Duration::seconds(1)));
        assert!(!token.is_used());
    }
}
