//! JWT Token Generation and Validation
//!
//! Access tokens are HS256 JWTs signed with a symmetric secret that never
//! leaves the signer. Verification accepts the HS256 algorithm only, so a
//! token whose header names another algorithm is rejected before its
//! signature is looked at.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::domain::SubjectId;
use crate::error::AuthError;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and verifies access tokens
pub trait TokenSigner: Send + Sync {
    /// Sign a token for `subject` that expires `ttl` from now
    fn issue(&self, subject: SubjectId, ttl: Duration) -> Result<String, AuthError>;

    /// Recover the subject of a valid, unexpired token.
    ///
    /// Every failure is `AuthError::Unauthorized`.
    fn verify(&self, token: &str) -> Result<SubjectId, AuthError>;
}

pub struct JwtSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    /// `leeway` is the clock skew tolerated past `exp`; zero means exact expiry.
    pub fn new(secret: &[u8], leeway: Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token with an explicit issue time (Unix seconds)
    pub fn issue_at(
        &self,
        subject: SubjectId,
        issued_at: i64,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let ttl_seconds = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Internal("access token ttl out of range".to_string()))?;
        let claims = Claims::new(subject, issued_at, ttl_seconds);

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenSigner for JwtSigner {
    fn issue(&self, subject: SubjectId, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(subject, chrono::Utc::now().timestamp(), ttl)
    }

    fn verify(&self, token: &str) -> Result<SubjectId, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                AuthError::Unauthorized
            })?;

        claims.subject().ok_or_else(|| {
            tracing::debug!("JWT subject is not a valid identifier");
            AuthError::Unauthorized
        })
    }
}
