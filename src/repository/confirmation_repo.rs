//! Confirmation token repository (Postgres)

use super::ConfirmationRepository;
use crate::{
    error::AppError,
    models::confirmation::{ConfirmOutcome, ConfirmationToken, NewConfirmation},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

pub struct PgConfirmationRepository {
    db: PgPool,
}

impl PgConfirmationRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfirmationRepository for PgConfirmationRepository {
    async fn create(&self, new: NewConfirmation) -> Result<ConfirmationToken, AppError> {
        let token = sqlx::query_as::<_, ConfirmationToken>(
            r#"
            INSERT INTO email_confirmations (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, confirmed_at, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.token_hash)
        .bind(new.expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(token)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<ConfirmationToken>, AppError> {
        let token = sqlx::query_as::<_, ConfirmationToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, confirmed_at, created_at
            FROM email_confirmations
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(token)
    }

    async fn confirm(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, AppError> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::Database(e)
        })?;

        // Row lock: a concurrent redeemer blocks here, then sees confirmed_at set
        let marked = sqlx::query(
            "UPDATE email_confirmations SET confirmed_at = $2 WHERE id = $1 AND confirmed_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            return Ok(ConfirmOutcome::AlreadyUsed);
        }

        let confirmed = sqlx::query("UPDATE users SET email_confirmed = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if confirmed.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Confirmation {} references missing user {}",
                id, user_id
            )));
        }

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::Database(e)
        })?;

        Ok(ConfirmOutcome::Applied)
    }
}
