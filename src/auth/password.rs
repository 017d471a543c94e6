//! Password Hashing and Verification
//!
//! One-way bcrypt hashing with a per-call random salt embedded in the output.
//! The work factor is configurable so it can be raised as hardware gets faster.

use bcrypt::BcryptError;

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("password hashing failed: {0}")]
    Internal(String),
}

/// Credential hasher
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password; two calls on the same input differ.
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Verify a plaintext password against a stored hash.
    ///
    /// A well-formed mismatch is `Ok(false)`; a hash in the wrong format is
    /// `Err(HashError::MalformedHash)`.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError>;
}

/// bcrypt-backed hasher
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Result<Self, HashError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(HashError::Internal(format!(
                "bcrypt cost {} outside {}..={}",
                cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashError::Internal(e.to_string()))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError> {
        // bcrypt compares the derived hash in constant time
        bcrypt::verify(plaintext, hash).map_err(|e| match e {
            BcryptError::InvalidHash(_)
            | BcryptError::InvalidPrefix(_)
            | BcryptError::InvalidCost(_)
            | BcryptError::InvalidBase64(_) => HashError::MalformedHash,
            other => HashError::Internal(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(MIN_BCRYPT_COST).expect("minimum cost is valid")
    }

    #[test]
    fn test_hash_password() {
        let password = "Qwerty123456";
        let hash = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hasher = hasher();
        let hash = hasher.hash("Qwerty123456").expect("Failed to hash password");

        assert_eq!(hasher.verify("Qwerty123456", &hash), Ok(true));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = hasher();
        let hash = hasher.hash("Qwerty123456").expect("Failed to hash password");

        assert_eq!(hasher.verify("Qwerty1234567", &hash), Ok(false));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let hasher = hasher();
        let first = hasher.hash("Qwerty123456").unwrap();
        let second = hasher.hash("Qwerty123456").unwrap();

        assert_ne!(first, second);
        assert_eq!(hasher.verify("Qwerty123456", &first), Ok(true));
        assert_eq!(hasher.verify("Qwerty123456", &second), Ok(true));
    }

    #[test]
    fn test_malformed_hash_is_distinguishable() {
        assert_eq!(
            hasher().verify("Qwerty123456", "not-a-bcrypt-hash"),
            Err(HashError::MalformedHash)
        );
    }

    #[test]
    fn test_cost_bounds() {
        assert!(BcryptHasher::new(3).is_err());
        assert!(BcryptHasher::new(32).is_err());
        assert_eq!(BcryptHasher::new(10).unwrap().cost(), 10);
        assert_eq!(BcryptHasher::default().cost(), bcrypt::DEFAULT_COST);
    }
}
