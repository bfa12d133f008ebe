//! In-memory stores.
//!
//! Suitable for tests and single-process development runs. Uniqueness of
//! usernames is enforced under the write lock, the same guarantee the
//! Postgres unique index gives.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::{sync::RwLock, time::Instant};
use uuid::Uuid;

use super::{
    error::StoreError,
    session::SessionData,
    store::{CredentialStore, InsertOutcome, SessionStore},
    user::User,
};

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<InsertOutcome, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.username == user.username) {
            return Ok(InsertOutcome::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(InsertOutcome::Created)
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get_mut(&user.id) {
            existing.clone_from(user);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Vec<u8>, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_hash: &[u8]) -> Result<Option<SessionData>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_hash)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(data, _)| data.clone()))
    }

    async fn save(
        &self,
        session_hash: &[u8],
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session_hash.to_vec(), (data.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn destroy(&self, session_hash: &[u8]) -> Result<(), StoreError> {
        self.sessions.write().await.remove(session_hash);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Flash;

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            reset_token: None,
            reset_token_expiry: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_username() -> Result<(), StoreError> {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.insert(&user("alice")).await?, InsertOutcome::Created);
        assert_eq!(store.insert(&user("alice")).await?, InsertOutcome::Conflict);
        assert_eq!(store.insert(&user("Alice")).await?, InsertOutcome::Created);
        assert_eq!(store.len().await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn lookups_are_exact() -> Result<(), StoreError> {
        let store = MemoryCredentialStore::new();
        let alice = user("alice");
        store.insert(&alice).await?;

        assert_eq!(store.find_by_username("alice").await?, Some(alice.clone()));
        assert_eq!(store.find_by_username("ALICE").await?, None);
        assert_eq!(store.find_by_id(alice.id).await?, Some(alice));
        assert_eq!(store.find_by_id(Uuid::new_v4()).await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_expire_and_are_purged() -> Result<(), StoreError> {
        let store = MemorySessionStore::new();
        let data = SessionData {
            identity: Some(Uuid::new_v4()),
            flash: Some(Flash::success("hi")),
        };
        store.save(b"short", &data, Duration::from_secs(10)).await?;
        store.save(b"long", &data, Duration::from_secs(100)).await?;
        assert_eq!(store.load(b"short").await?, Some(data.clone()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.load(b"short").await?, None);
        assert_eq!(store.load(b"long").await?, Some(data));

        assert_eq!(store.purge_expired().await?, 1);
        assert_eq!(store.len().await, 1);

        store.destroy(b"long").await?;
        store.destroy(b"missing").await?;
        assert!(store.is_empty().await);
        Ok(())
    }
}
