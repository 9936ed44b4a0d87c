//! In-memory session store mock.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::session::{Session, SessionId};
use async_trait::async_trait;
use boxoffice_core::ids::UserId;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory [`SessionStore`] with the same invariants as the Redis store:
/// fixation guard on create, immutable fields on update, expiry on read.
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl MockSessionStore {
    /// Creates an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions (test assertions).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Whether the store is empty.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)] // mock: lock poisoning is a test bug
impl SessionStore for MockSessionStore {
    async fn create_session(&self, session: &Session, _ttl: Duration) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.session_id) {
            return Err(AuthError::SessionConflict(
                "session id already exists".into(),
            ));
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session> {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get(&session_id)
            .cloned()
            .ok_or(AuthError::SessionNotFound)?;
        if session.is_expired(chrono::Utc::now()) {
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    async fn update_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let existing = sessions
            .get(&session.session_id)
            .ok_or(AuthError::SessionNotFound)?;
        if existing.user_id != session.user_id {
            return Err(AuthError::SessionConflict(
                "session user_id is immutable".into(),
            ));
        }
        if existing.ip_address != session.ip_address {
            return Err(AuthError::SessionConflict(
                "session ip_address is immutable".into(),
            ));
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<()> {
        self.sessions.lock().unwrap().remove(&session_id);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<usize> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn session() -> Session {
        Session::new(
            UserId::new(),
            "buyer@example.com".into(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "Test".into(),
            Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn mock_matches_store_invariants() {
        let store = MockSessionStore::new();
        let s = session();

        store.create_session(&s, Duration::hours(1)).await.unwrap();
        assert!(matches!(
            store.create_session(&s, Duration::hours(1)).await,
            Err(AuthError::SessionConflict(_))
        ));

        let mut tampered = s.clone();
        tampered.user_id = UserId::new();
        assert!(matches!(
            store.update_session(&tampered).await,
            Err(AuthError::SessionConflict(_))
        ));

        store.delete_session(s.session_id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn bulk_delete_counts() {
        let store = MockSessionStore::new();
        let user_id = UserId::new();
        for _ in 0..2 {
            let mut s = session();
            s.user_id = user_id;
            store.create_session(&s, Duration::hours(1)).await.unwrap();
        }
        store
            .create_session(&session(), Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.delete_user_sessions(user_id).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }
}
