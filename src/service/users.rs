//! Account management for authenticated callers

use std::sync::Arc;
use std::time::Duration;

use crate::auth::PasswordHasher;
use crate::domain::{StoredUserUpdate, SubjectId, User, UserLookup, UserUpdate};
use crate::error::AuthError;
use crate::service::{bounded, hash_password, verify_password};
use crate::store::UserStore;
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    store_timeout: Duration,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            users,
            hasher,
            store_timeout,
        }
    }

    pub async fn get_user(&self, lookup: UserLookup) -> Result<User, AuthError> {
        let user = match lookup {
            UserLookup::Id(id) => {
                bounded(self.store_timeout, "get_user_by_id", self.users.get_user_by_id(id)).await
            }
            UserLookup::Email(email) => {
                bounded(
                    self.store_timeout,
                    "get_user_by_email",
                    self.users.get_user_by_email(email.trim()),
                )
                .await
            }
            UserLookup::Username(username) => {
                bounded(
                    self.store_timeout,
                    "get_user_by_username",
                    self.users.get_user_by_username(username.trim()),
                )
                .await
            }
        }?;
        Ok(user)
    }

    /// Apply an update to the caller's own account.
    ///
    /// Changing the password requires the current one; a wrong current
    /// password is `InvalidCredentials`.
    #[tracing::instrument(name = "Update user", skip(self, update))]
    pub async fn update_user(
        &self,
        subject: SubjectId,
        update: UserUpdate,
    ) -> Result<User, AuthError> {
        let current = self.get_user(UserLookup::Id(subject)).await?;
        if current.is_deleted {
            return Err(AuthError::AlreadyDeleted);
        }

        let username = update
            .username
            .as_deref()
            .map(is_valid_username)
            .transpose()?;
        let email = update.email.as_deref().map(is_valid_email).transpose()?;

        let password_hash = match update.password {
            Some(change) => {
                is_valid_password(&change.new_password)?;
                if !verify_password(&self.hasher, &change.old_password, &current.password_hash)
                    .await?
                {
                    return Err(AuthError::InvalidCredentials);
                }
                Some(hash_password(&self.hasher, &change.new_password).await?)
            }
            None => None,
        };

        let id = bounded(
            self.store_timeout,
            "update_user",
            self.users.update_user(StoredUserUpdate {
                id: subject,
                username,
                email,
                password_hash,
            }),
        )
        .await?;

        tracing::info!(user_id = %id, "Account updated");
        self.get_user(UserLookup::Id(id)).await
    }

    /// Soft-delete the caller's own account; repeating it is not an error
    #[tracing::instrument(name = "Delete user", skip(self))]
    pub async fn delete_user(&self, subject: SubjectId) -> Result<(), AuthError> {
        bounded(self.store_timeout, "delete_user", self.users.delete_user(subject)).await?;
        tracing::info!(user_id = %subject, "Account deleted");
        Ok(())
    }
}
