use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn materialize(session: NewSession) -> Session {
        Session {
            id: SessionId::new_random(),
            user_id: session.user_id,
            hashed_refresh_token: session.hashed_refresh_token,
            fingerprint: session.fingerprint,
            expires_at: session.expires_at,
            created_at: Utc::now(),
        }
    }

    fn put(sessions: &mut HashMap<SessionId, Session>, session: NewSession) -> SessionId {
        sessions.retain(|_, s| {
            !(s.user_id == session.user_id && s.fingerprint == session.fingerprint)
        });
        let session = Self::materialize(session);
        let id = session.id;
        sessions.insert(id, session);
        id
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: NewSession) -> Result<SessionId, StoreError> {
        let mut sessions = self.sessions.write().await;
        Ok(Self::put(&mut sessions, session))
    }

    async fn find_by_user_and_fingerprint(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<Session, StoreError> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .find(|s| &s.user_id == user_id && &s.fingerprint == fingerprint)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_id(&self, id: SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn delete_all_by_user(&self, user_id: &UserId) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| &s.user_id != user_id);
        let removed = (before - sessions.len()) as u64;
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(removed)
    }

    async fn replace(
        &self,
        old: SessionId,
        session: NewSession,
    ) -> Result<SessionId, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&old).is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(Self::put(&mut sessions, session))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn count_for_user(&self, user_id: &UserId) -> Result<u64, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().filter(|s| &s.user_id == user_id).count() as u64)
    }
}
