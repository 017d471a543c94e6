//! Refresh Token identifiers
//!
//! Refresh tokens are opaque, unguessable identifiers:
//! - 64 random alphanumeric characters (about 380 bits of entropy)
//! - hashed with SHA-256 before a persistent store sees them
//! - single-use, consumed and replaced on every refresh

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

const REFRESH_TOKEN_LENGTH: usize = 64;

/// Generate a new cryptographically secure refresh token identifier
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 digest of a refresh token, hex encoded
///
/// Stores key their records by this digest so a leaked table does not leak
/// usable tokens.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
