//! In-memory stores for tests and single-process deployments

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, UserStore};
use crate::domain::{NewUser, StoredUserUpdate, SubjectId, User};
use crate::error::ConflictField;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<SubjectId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(
    users: &HashMap<SubjectId, User>,
    skip: Option<SubjectId>,
    username: Option<&str>,
    email: Option<&str>,
) -> Option<ConflictField> {
    let others = || users.values().filter(move |u| Some(u.id) != skip);

    if let Some(email) = email {
        if others().any(|u| u.email == email) {
            return Some(ConflictField::Email);
        }
    }
    if let Some(username) = username {
        if others().any(|u| u.username == username) {
            return Some(ConflictField::Username);
        }
    }
    None
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn add_user(&self, user: NewUser) -> Result<SubjectId, StoreError> {
        let mut users = lock(&self.users)?;

        if let Some(field) = conflict(&users, None, Some(&user.username), Some(&user.email)) {
            return Err(StoreError::Conflict(field));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        users.insert(
            id,
            User {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn get_user_by_id(&self, id: SubjectId) -> Result<User, StoreError> {
        lock(&self.users)?.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        lock(&self.users)?
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        lock(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, update: StoredUserUpdate) -> Result<SubjectId, StoreError> {
        let mut users = lock(&self.users)?;

        if !users.contains_key(&update.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(field) = conflict(
            &users,
            Some(update.id),
            update.username.as_deref(),
            update.email.as_deref(),
        ) {
            return Err(StoreError::Conflict(field));
        }

        let user = users.get_mut(&update.id).ok_or(StoreError::NotFound)?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();

        Ok(user.id)
    }

    async fn delete_user(&self, id: SubjectId) -> Result<(), StoreError> {
        let mut users = lock(&self.users)?;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !user.is_deleted {
            user.is_deleted = true;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Debug)]
struct StoredToken {
    subject: SubjectId,
    expires_at: Instant,
}

impl StoredToken {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Refresh tokens held in a map.
///
/// Expired entries are evicted when touched; long-running processes should
/// also call `purge_expired` periodically.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<String, StoredToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.tokens.lock().map(|tokens| tokens.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut tokens = lock(&self.tokens)?;
        let before = tokens.len();
        let now = Instant::now();
        tokens.retain(|_, token| token.is_live(now));
        Ok(u64::try_from(before - tokens.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn put(&self, subject: SubjectId, token_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::Unavailable("refresh token ttl out of range".to_string()))?;

        lock(&self.tokens)?.insert(token_id.to_string(), StoredToken { subject, expires_at });
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<SubjectId, StoreError> {
        let mut tokens = lock(&self.tokens)?;
        let Some(token) = tokens.get(token_id) else {
            return Err(StoreError::NotFound);
        };
        if token.is_live(Instant::now()) {
            return Ok(token.subject);
        }

        tokens.remove(token_id);
        Err(StoreError::NotFound)
    }

    async fn delete(&self, token_id: &str) -> Result<(), StoreError> {
        lock(&self.tokens)?.remove(token_id);
        Ok(())
    }

    async fn take(&self, token_id: &str) -> Result<SubjectId, StoreError> {
        // remove under the lock: at most one caller sees the entry
        let token = lock(&self.tokens)?.remove(token_id).ok_or(StoreError::NotFound)?;
        if token.is_live(Instant::now()) {
            Ok(token.subject)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_fetch_user() {
        let store = InMemoryUserStore::new();
        let id = store.add_user(new_user("alex", "alex@x.com")).await.unwrap();

        let by_id = store.get_user_by_id(id).await.unwrap();
        assert_eq!(by_id.username, "alex");
        assert!(!by_id.is_deleted);
        assert_eq!(store.get_user_by_email("alex@x.com").await.unwrap().id, id);
        assert_eq!(store.get_user_by_username("alex").await.unwrap().id, id);
        assert_eq!(
            store.get_user_by_email("nobody@x.com").await.unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn test_add_user_reports_conflicting_field() {
        let store = InMemoryUserStore::new();
        store.add_user(new_user("alex", "alex@x.com")).await.unwrap();

        assert_eq!(
            store.add_user(new_user("other", "alex@x.com")).await.unwrap_err(),
            StoreError::Conflict(ConflictField::Email)
        );
        assert_eq!(
            store.add_user(new_user("alex", "other@x.com")).await.unwrap_err(),
            StoreError::Conflict(ConflictField::Username)
        );
    }

    #[tokio::test]
    async fn test_update_ignores_own_values() {
        let store = InMemoryUserStore::new();
        let id = store.add_user(new_user("alex", "alex@x.com")).await.unwrap();
        store.add_user(new_user("sam", "sam@x.com")).await.unwrap();

        let same = StoredUserUpdate {
            id,
            username: Some("alex".to_string()),
            ..Default::default()
        };
        assert_eq!(store.update_user(same).await.unwrap(), id);

        let clash = StoredUserUpdate {
            id,
            email: Some("sam@x.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            store.update_user(clash).await.unwrap_err(),
            StoreError::Conflict(ConflictField::Email)
        );
    }

    #[tokio::test]
    async fn test_delete_user_is_soft_and_idempotent() {
        let store = InMemoryUserStore::new();
        let id = store.add_user(new_user("alex", "alex@x.com")).await.unwrap();

        store.delete_user(id).await.unwrap();
        store.delete_user(id).await.unwrap();
        assert!(store.get_user_by_id(id).await.unwrap().is_deleted);
    }

    #[tokio::test]
    async fn test_refresh_token_put_get_delete() {
        let store = InMemoryRefreshTokenStore::new();
        let subject = Uuid::new_v4();

        store.put(subject, "token", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), subject);

        store.delete("token").await.unwrap();
        assert_eq!(store.get("token").await.unwrap_err(), StoreError::NotFound);
        // deleting an absent key is not an error
        store.delete("token").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_token_is_absent() {
        let store = InMemoryRefreshTokenStore::new();
        store.put(Uuid::new_v4(), "token", Duration::ZERO).await.unwrap();

        assert_eq!(store.get("token").await.unwrap_err(), StoreError::NotFound);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired_drops_only_dead_entries() {
        let store = InMemoryRefreshTokenStore::new();
        let subject = Uuid::new_v4();
        store.put(subject, "dead-1", Duration::ZERO).await.unwrap();
        store.put(subject, "dead-2", Duration::ZERO).await.unwrap();
        store.put(subject, "live", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("live").await.unwrap(), subject);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_take_consumes_once() {
        let store = InMemoryRefreshTokenStore::new();
        let subject = Uuid::new_v4();
        store.put(subject, "token", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.take("token").await.unwrap(), subject);
        assert_eq!(store.take("token").await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = InMemoryRefreshTokenStore::new();
        let second = Uuid::new_v4();
        store.put(Uuid::new_v4(), "token", Duration::from_secs(60)).await.unwrap();
        store.put(second, "token", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("token").await.unwrap(), second);
        assert_eq!(store.len(), 1);
    }
}
