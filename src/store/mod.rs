//! Storage capabilities consumed by the core
//!
//! The core never talks to a database directly. It goes through `UserStore`
//! and `RefreshTokenStore`, each with an in-memory and a Postgres
//! implementation.

mod memory;
mod postgres;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use postgres::{PgRefreshTokenStore, PgUserStore};

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{NewUser, StoredUserUpdate, SubjectId, User};
use crate::error::ConflictField;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("{0} already exists")]
    Conflict(ConflictField),
    #[error("store call timed out: {0}")]
    Timeout(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut => StoreError::Timeout("pool acquire"),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                // unique_violation; the constraint name identifies the column
                if db_err.message().contains("username") {
                    StoreError::Conflict(ConflictField::Username)
                } else {
                    StoreError::Conflict(ConflictField::Email)
                }
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Account storage
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account, failing with `Conflict` naming the clashing field
    async fn add_user(&self, user: NewUser) -> Result<SubjectId, StoreError>;

    async fn get_user_by_id(&self, id: SubjectId) -> Result<User, StoreError>;

    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Apply the present fields of `update`, returning the account id
    async fn update_user(&self, update: StoredUserUpdate) -> Result<SubjectId, StoreError>;

    /// Mark an account deleted; deleting twice is not an error
    async fn delete_user(&self, id: SubjectId) -> Result<(), StoreError>;
}

/// Single-use refresh-token storage with store-managed expiry
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Map `token_id` to `subject` for `ttl`, overwriting any existing entry
    async fn put(&self, subject: SubjectId, token_id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Subject for a live token; `NotFound` if absent or expired
    async fn get(&self, token_id: &str) -> Result<SubjectId, StoreError>;

    /// Remove a token; removing an absent token succeeds
    async fn delete(&self, token_id: &str) -> Result<(), StoreError>;

    /// Consume a token: return its subject and remove it.
    ///
    /// The default runs `get` then `delete` and is only as safe as the
    /// backend's per-key ordering. Implementations with an atomic
    /// get-and-delete override it so that concurrent callers cannot both
    /// consume the same token.
    async fn take(&self, token_id: &str) -> Result<SubjectId, StoreError> {
        let subject = self.get(token_id).await?;
        self.delete(token_id).await?;
        Ok(subject)
    }
}
