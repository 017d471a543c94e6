//! JWT Claims structure
//!
//! Access tokens carry only the subject and their validity window.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::SubjectId;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims valid from `issued_at` for `ttl_seconds`
    pub fn new(subject: SubjectId, issued_at: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_seconds),
        }
    }

    /// Parse the subject back into an identity
    pub fn subject(&self) -> Option<SubjectId> {
        Uuid::parse_str(&self.sub).ok()
    }
}
