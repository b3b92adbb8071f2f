//! Storage layer
//! Async traits over users and confirmation tokens, with Postgres and in-memory backends

pub mod confirmation_repo;
pub mod memory;
pub mod user_repo;

pub use confirmation_repo::PgConfirmationRepository;
pub use memory::MemoryStore;
pub use user_repo::PgUserRepository;

use crate::{
    error::AppError,
    models::{
        confirmation::{ConfirmOutcome, ConfirmationToken, NewConfirmation},
        user::User,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Lookup by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a new unconfirmed user. `AppError::Conflict` if the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError>;
}

#[async_trait]
pub trait ConfirmationRepository: Send + Sync {
    async fn create(&self, new: NewConfirmation) -> Result<ConfirmationToken, AppError>;

    async fn find_by_token_hash(&self, token_hash: &str)
        -> Result<Option<ConfirmationToken>, AppError>;

    /// Mark the token used and the user confirmed, as one atomic unit.
    /// Only the first caller for a given token gets `Applied`.
    async fn confirm(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, AppError>;
}

/// The repositories a running service uses
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub confirmations: Arc<dyn ConfirmationRepository>,
    /// Present for the Postgres backend, used by readiness checks
    pub pool: Option<PgPool>,
}

impl Storage {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            confirmations: Arc::new(PgConfirmationRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    /// Share one in-memory store across both traits
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            confirmations: store,
            pool: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}
