//! Persistence seams for users and sessions.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use super::{error::StoreError, session::SessionData, user::User};

/// Outcome of inserting a new user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// The username is already taken (unique index violation).
    Conflict,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive username lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new user. A duplicate username is reported as
    /// [`InsertOutcome::Conflict`], not as an error.
    async fn insert(&self, user: &User) -> Result<InsertOutcome, StoreError>;

    /// Overwrite an existing user with the given, already sealed, record.
    async fn update(&self, user: &User) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Server-side session persistence keyed by the hash of the cookie value.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load an unexpired session.
    async fn load(&self, session_hash: &[u8]) -> Result<Option<SessionData>, StoreError>;

    /// Insert or replace a session, resetting its expiry to `now + ttl`.
    async fn save(
        &self,
        session_hash: &[u8],
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Remove a session. Missing sessions are not an error.
    async fn destroy(&self, session_hash: &[u8]) -> Result<(), StoreError>;

    /// Remove every expired session, returning how many were deleted.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// Run a store operation with an upper bound on its duration.
///
/// # Errors
/// Returns [`StoreError::Timeout`] when `limit` elapses first, otherwise the
/// operation's own result.
pub async fn bounded<T, F>(limit: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
