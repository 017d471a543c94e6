//! Postgres-backed stores (sqlx)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, UserStore};
use crate::auth::hash_token;
use crate::domain::{NewUser, StoredUserUpdate, SubjectId, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_deleted, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn add_user(&self, user: NewUser) -> Result<SubjectId, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_user_by_id(&self, id: SubjectId) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.fetch_one_by("username", username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.fetch_one_by("email", email).await
    }

    async fn update_user(&self, update: StoredUserUpdate) -> Result<SubjectId, StoreError> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(update.id)
        .bind(update.username)
        .bind(update.email)
        .bind(update.password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: SubjectId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                is_deleted = TRUE,
                updated_at = CASE WHEN is_deleted THEN updated_at ELSE NOW() END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| StoreError::Unavailable("refresh token ttl out of range".to_string()))
}

/// Refresh tokens in Postgres, keyed by the SHA-256 digest of the identifier
#[derive(Debug, Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete expired rows; reads already ignore them
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn put(&self, subject: SubjectId, token_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = expiry_from(Utc::now(), ttl)?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (token_hash) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(hash_token(token_id))
        .bind(subject)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<SubjectId, StoreError> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM refresh_tokens WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(hash_token(token_id))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, token_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(token_id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("no refresh token was deleted, key may not exist");
        }
        Ok(())
    }

    async fn take(&self, token_id: &str) -> Result<SubjectId, StoreError> {
        // a single DELETE .. RETURNING: concurrent callers cannot both get the row
        let row = sqlx::query_as::<_, (Uuid, bool)>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash = $1
            RETURNING user_id, expires_at > NOW()
            "#,
        )
        .bind(hash_token(token_id))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((subject, true)) => Ok(subject),
            _ => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_adds_ttl() {
        let now = Utc::now();
        let expires_at = expiry_from(now, Duration::from_secs(60)).unwrap();

        assert_eq!(expires_at - now, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_expiry_out_of_range_is_an_error() {
        let now = Utc::now();

        assert!(matches!(
            expiry_from(now, Duration::from_secs(10_000_000_000_000)),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            expiry_from(now, Duration::MAX),
            Err(StoreError::Unavailable(_))
        ));
    }
}
