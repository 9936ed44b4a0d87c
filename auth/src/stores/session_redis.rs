//! Redis-based session store.
//!
//! Sessions are stored with:
//! - **Primary key**: `session:{session_id}` → bincode-serialized [`Session`]
//! - **User index**: `user:{user_id}:sessions` (set) → session ids
//! - **TTL**: refreshed on every update (sliding window)
//!
//! The user index carries its own TTL (session TTL + one day) so it cannot
//! grow unbounded when sessions expire without an explicit logout.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::session::{Session, SessionId};
use async_trait::async_trait;
use boxoffice_core::ids::UserId;
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based session store with TTL expiry and a per-user index.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Creates a new Redis session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::StorageError(format!("failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::StorageError(format!("failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    fn session_key(session_id: SessionId) -> String {
        format!("session:{}", session_id.0)
    }

    fn user_sessions_key(user_id: UserId) -> String {
        format!("user:{}:sessions", user_id.as_uuid())
    }

    async fn exists(&self, session_id: SessionId) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        conn.exists(Self::session_key(session_id))
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to check session: {e}")))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create_session(&self, session: &Session, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(session.session_id);
        let user_sessions_key = Self::user_sessions_key(session.user_id);

        // Fixation guard: a live session id can never be overwritten.
        if self.exists(session.session_id).await? {
            return Err(AuthError::SessionConflict(
                "session id already exists".into(),
            ));
        }

        let session_bytes = bincode::serialize(session)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = ttl.num_seconds().max(0) as u64;

        // Pipeline keeps the session key and the user index in step; the
        // index TTL outlives the session by a day so it is cleaned up even
        // without a logout.
        #[allow(clippy::cast_possible_wrap)]
        let index_ttl_seconds = (ttl_seconds + 86_400) as i64;

        let _: () = redis::pipe()
            .atomic()
            .set_ex(&session_key, session_bytes, ttl_seconds)
            .sadd(&user_sessions_key, session.session_id.0.to_string())
            .ignore()
            .expire(&user_sessions_key, index_ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to create session: {e}")))?;

        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            ttl_seconds,
            "created session"
        );

        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(session_id);

        let session_bytes: Option<Vec<u8>> = conn
            .get(&session_key)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to get session: {e}")))?;

        match session_bytes {
            Some(bytes) => {
                let session: Session = bincode::deserialize(&bytes)
                    .map_err(|e| AuthError::SerializationError(e.to_string()))?;

                // Redis TTL should have removed this already; the wall-clock
                // check guards against clock skew and TTL manipulation.
                if session.is_expired(chrono::Utc::now()) {
                    tracing::warn!(
                        session_id = %session_id,
                        expires_at = %session.expires_at,
                        "session outlived its expiry"
                    );
                    return Err(AuthError::SessionExpired);
                }

                Ok(session)
            }
            None => Err(AuthError::SessionNotFound),
        }
    }

    async fn update_session(&self, session: &Session) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(session.session_id);

        // Immutable fields may not change across updates; a write that
        // swaps user_id is a privilege escalation attempt.
        let existing = self.get_session(session.session_id).await?;
        if existing.user_id != session.user_id {
            tracing::error!(
                session_id = %session.session_id,
                "attempt to change immutable session user_id"
            );
            return Err(AuthError::SessionConflict(
                "session user_id is immutable".into(),
            ));
        }
        if existing.ip_address != session.ip_address {
            tracing::error!(
                session_id = %session.session_id,
                "attempt to change immutable session ip_address"
            );
            return Err(AuthError::SessionConflict(
                "session ip_address is immutable".into(),
            ));
        }

        let session_bytes = bincode::serialize(session)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        // Sliding window: TTL is recomputed from expires_at, not carried
        // over, so active users stay signed in.
        let fresh_ttl = session.expires_at.signed_duration_since(chrono::Utc::now());
        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = fresh_ttl.num_seconds().max(0) as u64;

        let _: () = conn
            .set_ex(&session_key, session_bytes, ttl_seconds)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to update session: {e}")))?;

        tracing::debug!(
            session_id = %session.session_id,
            ttl_seconds,
            "updated session"
        );

        Ok(())
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = Self::session_key(session_id);

        match self.get_session(session_id).await {
            Ok(session) => {
                let user_sessions_key = Self::user_sessions_key(session.user_id);
                let _: () = conn
                    .srem(&user_sessions_key, session_id.0.to_string())
                    .await
                    .map_err(|e| {
                        AuthError::StorageError(format!(
                            "failed to remove session from user index: {e}"
                        ))
                    })?;
            }
            // Deleting an absent or expired session is a no-op.
            Err(AuthError::SessionNotFound | AuthError::SessionExpired) => {}
            Err(e) => return Err(e),
        }

        let _: () = conn
            .del(&session_key)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to delete session: {e}")))?;

        tracing::info!(session_id = %session_id, "deleted session");

        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<usize> {
        let mut conn = self.conn_manager.clone();
        let user_sessions_key = Self::user_sessions_key(user_id);

        // The Lua script walks the index and deletes on the server, so a
        // session created concurrently is either in the set (deleted) or
        // created after the script ran (kept) — never orphaned.
        let lua_script = r"
            local user_set_key = KEYS[1]
            local session_ids = redis.call('SMEMBERS', user_set_key)
            local deleted_count = 0

            for i, session_id in ipairs(session_ids) do
                local session_key = 'session:' .. session_id
                if redis.call('DEL', session_key) == 1 then
                    deleted_count = deleted_count + 1
                end
            end

            redis.call('DEL', user_set_key)
            return deleted_count
        ";

        let script = redis::Script::new(lua_script);
        let deleted_count: usize = script
            .key(&user_sessions_key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                AuthError::StorageError(format!("failed to delete user sessions: {e}"))
            })?;

        tracing::info!(
            user_id = %user_id,
            session_count = deleted_count,
            "deleted all user sessions"
        );

        Ok(deleted_count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::user::Role;
    use chrono::Utc;
    use std::net::{IpAddr, Ipv4Addr};

    // These tests require a running Redis instance:
    // docker run -d -p 6379:6379 redis:7-alpine

    fn session(ttl: Duration) -> Session {
        Session::new(
            UserId::new(),
            "buyer@example.com".into(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "Test".into(),
            ttl,
        )
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn session_lifecycle() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let session = session(Duration::hours(24));

        store
            .create_session(&session, Duration::hours(24))
            .await
            .unwrap();

        let retrieved = store.get_session(session.session_id).await.unwrap();
        assert_eq!(retrieved.session_id, session.session_id);
        assert_eq!(retrieved.active_role, Role::Buyer);

        store.delete_session(session.session_id).await.unwrap();
        assert!(matches!(
            store.get_session(session.session_id).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn expired_session_rejected_despite_ttl() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let mut session = session(Duration::hours(1));
        session.expires_at = Utc::now() - Duration::seconds(10);

        // Redis TTL is still generous; the application-level check must
        // reject anyway.
        store
            .create_session(&session, Duration::seconds(60))
            .await
            .unwrap();

        assert!(matches!(
            store.get_session(session.session_id).await,
            Err(AuthError::SessionExpired)
        ));

        let _ = store.delete_session(session.session_id).await;
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn duplicate_session_id_is_rejected() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let first = session(Duration::hours(1));
        store
            .create_session(&first, Duration::hours(1))
            .await
            .unwrap();

        let mut hijack = session(Duration::hours(1));
        hijack.session_id = first.session_id;

        assert!(matches!(
            store.create_session(&hijack, Duration::hours(1)).await,
            Err(AuthError::SessionConflict(_))
        ));

        // The original survives untouched.
        let retrieved = store.get_session(first.session_id).await.unwrap();
        assert_eq!(retrieved.user_id, first.user_id);

        store.delete_session(first.session_id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn immutable_fields_are_enforced() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let original = session(Duration::hours(1));
        store
            .create_session(&original, Duration::hours(1))
            .await
            .unwrap();

        let mut tampered = original.clone();
        tampered.user_id = UserId::new();
        assert!(matches!(
            store.update_session(&tampered).await,
            Err(AuthError::SessionConflict(_))
        ));

        let mut tampered = original.clone();
        tampered.ip_address = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert!(matches!(
            store.update_session(&tampered).await,
            Err(AuthError::SessionConflict(_))
        ));

        // Role switching is a legal update.
        let mut switched = original.clone();
        switched.active_role = Role::Organizer;
        switched.touch(Duration::hours(1));
        store.update_session(&switched).await.unwrap();

        let retrieved = store.get_session(original.session_id).await.unwrap();
        assert_eq!(retrieved.active_role, Role::Organizer);

        store.delete_session(original.session_id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn bulk_delete_removes_every_session() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user_id = UserId::new();
        let sessions: Vec<Session> = (0..3)
            .map(|_| {
                let mut s = session(Duration::hours(1));
                s.user_id = user_id;
                s
            })
            .collect();

        for s in &sessions {
            store.create_session(s, Duration::hours(1)).await.unwrap();
        }

        let deleted = store.delete_user_sessions(user_id).await.unwrap();
        assert_eq!(deleted, 3);

        for s in &sessions {
            assert!(matches!(
                store.get_session(s.session_id).await,
                Err(AuthError::SessionNotFound)
            ));
        }
    }
}
