//! Account and token types shared by the stores and services

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Identity carried by access tokens and refresh-token records
pub type SubjectId = Uuid;

/// Account record as held by the user store
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: SubjectId,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the plaintext
    pub password_hash: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account about to be created; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Signup input as received from the caller
#[derive(Clone)]
pub struct Signup {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Signup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signup")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Requested changes to an account; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<PasswordChange>,
}

#[derive(Clone)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

/// Changes handed to the user store, with any new password already hashed
#[derive(Debug, Clone, Default)]
pub struct StoredUserUpdate {
    pub id: SubjectId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// How a caller identifies an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(SubjectId),
    Email(String),
    Username(String),
}

/// Identity field presented at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentity {
    Email(String),
    Username(String),
}

impl LoginIdentity {
    /// Anything containing `@` is an email; usernames may not contain one.
    pub fn parse(identity: &str) -> Self {
        let trimmed = identity.trim();
        if trimmed.contains('@') {
            LoginIdentity::Email(trimmed.to_string())
        } else {
            LoginIdentity::Username(trimmed.to_string())
        }
    }
}

/// Access/refresh pair returned by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Outcome of probing an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub user_id: Option<SubjectId>,
}
