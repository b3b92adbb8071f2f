//! In-memory storage backend
//! Used by tests and by `storage.backend = "memory"` for local development

use super::{ConfirmationRepository, UserRepository};
use crate::{
    error::AppError,
    models::{
        confirmation::{ConfirmOutcome, ConfirmationToken, NewConfirmation},
        user::User,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    users_by_email: DashMap<String, Uuid>,
    confirmations: DashMap<Uuid, ConfirmationToken>,
    confirmations_by_hash: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All confirmation rows issued for a user, oldest first
    pub fn confirmations_for(&self, user_id: Uuid) -> Vec<ConfirmationToken> {
        let mut rows: Vec<_> = self
            .confirmations
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|row| row.created_at);
        rows
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(id) = self.users_by_email.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        // The vacant entry stays locked until the user row is in place
        match self.users_by_email.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Email is already registered".to_string())),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    email_confirmed: false,
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }
}

#[async_trait]
impl ConfirmationRepository for MemoryStore {
    async fn create(&self, new: NewConfirmation) -> Result<ConfirmationToken, AppError> {
        match self.confirmations_by_hash.entry(new.token_hash.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "Confirmation token already exists".to_string(),
            )),
            Entry::Vacant(slot) => {
                let token = ConfirmationToken {
                    id: Uuid::new_v4(),
                    user_id: new.user_id,
                    token_hash: new.token_hash,
                    expires_at: new.expires_at,
                    confirmed_at: None,
                    created_at: Utc::now(),
                };
                self.confirmations.insert(token.id, token.clone());
                slot.insert(token.id);
                Ok(token)
            }
        }
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<ConfirmationToken>, AppError> {
        let Some(id) = self.confirmations_by_hash.get(token_hash).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.confirmations.get(&id).map(|row| row.value().clone()))
    }

    async fn confirm(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, AppError> {
        // Holding the row guard serializes redeemers of this token only.
        // Lock order is always confirmation row, then user row.
        let mut row = self
            .confirmations
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("confirmation"))?;

        if row.confirmed_at.is_some() {
            return Ok(ConfirmOutcome::AlreadyUsed);
        }

        let mut user = self.users.get_mut(&user_id).ok_or_else(|| {
            AppError::Internal(format!("Confirmation {} references missing user {}", id, user_id))
        })?;

        user.email_confirmed = true;
        row.confirmed_at = Some(at);

        Ok(ConfirmOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        UserRepository::create(&store, "raccoon@example.com", "hash").await.unwrap();

        let err = UserRepository::create(&store, "raccoon@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_applies_once() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, "raccoon@example.com", "hash").await.unwrap();
        let token = ConfirmationRepository::create(
            &store,
            NewConfirmation {
                user_id: user.id,
                token_hash: "ab".repeat(32),
                expires_at: Utc::now() + Duration::hours(24),
            },
        )
        .await
        .unwrap();

        let now = Utc::now();
        assert_eq!(
            store.confirm(token.id, user.id, now).await.unwrap(),
            ConfirmOutcome::Applied
        );
        assert_eq!(
            store.confirm(token.id, user.id, now).await.unwrap(),
            ConfirmOutcome::AlreadyUsed
        );

        let stored = store.find_by_token_hash(&token.token_hash).await.unwrap().unwrap();
        assert_eq!(stored.confirmed_at, Some(now));
        assert!(store.find_by_id(user.id).await.unwrap().unwrap().email_confirmed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_confirm_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let user = UserRepository::create(&*store, "raccoon@example.com", "hash").await.unwrap();
        let token = ConfirmationRepository::create(
            &*store,
            NewConfirmation {
                user_id: user.id,
                token_hash: "cd".repeat(32),
                expires_at: Utc::now() + Duration::hours(24),
            },
        )
        .await
        .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.confirm(token.id, user.id, Utc::now()).await.unwrap() })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() == ConfirmOutcome::Applied {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn test_unknown_confirmation_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .confirm(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
