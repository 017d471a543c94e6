//! Per-call authentication gate
//!
//! Turns a bearer credential into an `AuthContext` or rejects the call with a
//! bare `Unauthorized`. The specific reason a token failed is logged, never
//! returned.

use std::sync::Arc;

use crate::auth::jwt::TokenSigner;
use crate::domain::SubjectId;
use crate::error::AuthError;

const BEARER_SCHEME: &str = "bearer";

/// Identity attached to a call once its token has been accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: SubjectId,
}

#[derive(Clone)]
pub struct RequestAuthenticator {
    signer: Arc<dyn TokenSigner>,
}

impl RequestAuthenticator {
    pub fn new(signer: Arc<dyn TokenSigner>) -> Self {
        Self { signer }
    }

    /// Authenticate a call from its raw authorization value, if any
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext, AuthError> {
        let Some(raw) = authorization else {
            tracing::debug!("token is not provided");
            return Err(AuthError::Unauthorized);
        };

        let token = bearer_token(raw);
        if token.is_empty() {
            tracing::debug!("token is empty");
            return Err(AuthError::Unauthorized);
        }

        let user_id = self.signer.verify(token).map_err(|_| AuthError::Unauthorized)?;
        tracing::debug!(user_id = %user_id, "token accepted");

        Ok(AuthContext { user_id })
    }
}

/// Strip an optional `Bearer` scheme (any case) and surrounding whitespace
pub fn bearer_token(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..BEARER_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            trimmed[BEARER_SCHEME.len()..].trim()
        }
        _ => trimmed,
    }
}
