//! Redis-based single-use token store for magic links.
//!
//! Tokens live under `auth:token:{token_id}` as JSON with a TTL matching
//! their expiry. Consumption uses `GETDEL`, so concurrent verification
//! attempts resolve to exactly one winner, and the embedded secret is
//! compared in constant time.

use crate::error::{AuthError, Result};
use crate::providers::{TokenData, TokenStore};
use async_trait::async_trait;
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based token store with atomic consumption.
#[derive(Clone)]
pub struct RedisTokenStore {
    conn_manager: ConnectionManager,
}

impl RedisTokenStore {
    /// Creates a new Redis token store.
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

    /// Key namespacing prevents collisions with session keys on a shared
    /// Redis instance.
    fn token_key(token_id: &str) -> String {
        format!("auth:token:{token_id}")
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store_token(&self, token_id: &str, data: TokenData) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(token_id);

        let token_bytes = serde_json::to_vec(&data)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let ttl = data.expires_at.signed_duration_since(Utc::now());
        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        let _: () = conn
            .set_ex(&token_key, token_bytes, ttl_seconds)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to store token: {e}")))?;

        tracing::debug!(token_id, ttl_seconds, "stored sign-in token");

        Ok(())
    }

    async fn consume_token(&self, token_id: &str, secret: &str) -> Result<Option<TokenData>> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(token_id);

        // GETDEL removes the token in the same round-trip, so there is no
        // window in which two verifications can both succeed.
        let token_bytes: Option<Vec<u8>> = conn
            .get_del(&token_key)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to consume token: {e}")))?;

        let Some(bytes) = token_bytes else {
            return Ok(None);
        };

        let data: TokenData = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        if !constant_time_eq(data.secret.as_bytes(), secret.as_bytes()) {
            tracing::warn!(token_id, "sign-in token secret mismatch");
            return Ok(None);
        }

        // TTL already removes expired tokens; the wall-clock check is the
        // backstop against clock skew.
        if data.expires_at <= Utc::now() {
            tracing::debug!(token_id, "sign-in token expired");
            return Ok(None);
        }

        Ok(Some(data))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    // These tests require a running Redis instance:
    // docker run -d -p 6379:6379 redis:7-alpine

    fn token_data(secret: &str, expires_in: Duration) -> TokenData {
        TokenData {
            email: "buyer@example.com".into(),
            secret: secret.into(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn token_is_single_use() {
        let store = RedisTokenStore::new("redis://127.0.0.1:6379").await.unwrap();

        store
            .store_token("tok-1", token_data("secret", Duration::minutes(15)))
            .await
            .unwrap();

        let first = store.consume_token("tok-1", "secret").await.unwrap();
        assert!(first.is_some());

        let second = store.consume_token("tok-1", "secret").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn wrong_secret_burns_the_token() {
        let store = RedisTokenStore::new("redis://127.0.0.1:6379").await.unwrap();

        store
            .store_token("tok-2", token_data("secret", Duration::minutes(15)))
            .await
            .unwrap();

        // A guessed-wrong secret consumes the token rather than leaving it
        // around for further guesses.
        let result = store.consume_token("tok-2", "wrong").await.unwrap();
        assert!(result.is_none());

        let retry = store.consume_token("tok-2", "secret").await.unwrap();
        assert!(retry.is_none());
    }
}
