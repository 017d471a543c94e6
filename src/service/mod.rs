//! Account and session services
//!
//! Every store call is bounded by the configured store timeout and every
//! bcrypt call runs on the blocking pool.

mod session;
mod users;

pub use session::SessionIssuer;
pub use users::UserService;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{HashError, PasswordHasher};
use crate::store::StoreError;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                operation = operation,
                timeout_ms = millis(limit),
                "Store call timed out"
            );
            Err(StoreError::Timeout(operation))
        }
    }
}

pub(crate) async fn hash_password(
    hasher: &Arc<dyn PasswordHasher>,
    password: &str,
) -> Result<String, HashError> {
    let hasher = Arc::clone(hasher);
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| HashError::Internal(format!("hashing task failed: {}", e)))?
}

pub(crate) async fn verify_password(
    hasher: &Arc<dyn PasswordHasher>,
    password: &str,
    hash: &str,
) -> Result<bool, HashError> {
    let hasher = Arc::clone(hasher);
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| HashError::Internal(format!("verification task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        };

        let result = bounded(Duration::from_millis(10), "slow_call", slow).await;
        assert_eq!(result, Err(StoreError::Timeout("slow_call")));
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let result = bounded(Duration::from_secs(1), "fast_call", async {
            Err::<(), _>(StoreError::NotFound)
        })
        .await;
        assert_eq!(result, Err(StoreError::NotFound));
    }
}
