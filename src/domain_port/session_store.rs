use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflicting record")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable record of active refresh sessions.
///
/// Every method is atomic on its own: a write either fully applies or leaves
/// the store unchanged, and no reader observes an intermediate state.
/// `(user_id, fingerprint)` is unique across the store.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session, superseding any existing one for the same
    /// `(user_id, fingerprint)` in the same transaction.
    async fn insert(&self, session: NewSession) -> Result<SessionId, StoreError>;

    async fn find_by_user_and_fingerprint(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<Session, StoreError>;

    async fn delete_by_id(&self, id: SessionId) -> Result<(), StoreError>;

    /// Returns the number of removed sessions; `NotFound` if there were none.
    async fn delete_all_by_user(&self, user_id: &UserId) -> Result<u64, StoreError>;

    /// Delete `old` and insert `session` in one transaction. If `old` is gone
    /// the store is left unchanged and `NotFound` is returned.
    async fn replace(&self, old: SessionId, session: NewSession)
    -> Result<SessionId, StoreError>;

    /// Remove every session whose `expires_at` is before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Diagnostics helper: active records for one user. Not used on any
    /// request path.
    async fn count_for_user(&self, user_id: &UserId) -> Result<u64, StoreError>;
}
