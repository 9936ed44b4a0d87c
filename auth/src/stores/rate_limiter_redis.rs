//! Redis-based sliding-window rate limiter.
//!
//! Attempts are timestamps in a sorted set: prune entries outside the
//! window, count what remains, and reject once the count reaches the
//! limit. The check and the record happen in one atomic pipeline so
//! concurrent requests cannot both slip under the limit.

use crate::error::{AuthError, Result};
use crate::providers::RateLimiter;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Redis-based rate limiter using a sliding window over sorted sets.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn_manager: ConnectionManager,
}

impl RedisRateLimiter {
    /// Creates a new Redis rate limiter.
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

    fn rate_limit_key(key: &str) -> String {
        format!("rate_limit:{key}")
    }

    #[allow(clippy::cast_possible_truncation)] // timestamps fit in u64 until year 2554
    fn current_timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let rate_key = Self::rate_limit_key(key);
        let now_ms = Self::current_timestamp_ms();
        #[allow(clippy::cast_possible_truncation)]
        let window_ms = window.as_millis() as u64;
        let window_start = now_ms.saturating_sub(window_ms);

        // Prune + count + record atomically; both concurrent requests see
        // the other's ZADD or neither passes the count.
        #[allow(clippy::cast_possible_wrap)]
        let (_, count, _, _): ((), u64, (), ()) = redis::pipe()
            .atomic()
            .zrembyscore(&rate_key, 0, window_start as isize)
            .zcard(&rate_key)
            .zadd(&rate_key, now_ms, now_ms)
            .expire(&rate_key, 3_600)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to check rate limit: {e}")))?;

        if count >= u64::from(max_attempts) {
            tracing::warn!(key = %key, count, max_attempts, "rate limit exceeded");
            return Err(AuthError::TooManyAttempts {
                retry_after: window,
            });
        }

        tracing::debug!(key = %key, count, "recorded rate limit attempt");

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // These tests require a running Redis instance:
    // docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn limit_is_enforced_inside_the_window() {
        let limiter = RedisRateLimiter::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        for _ in 0..3 {
            limiter
                .check_and_record(&key, 3, Duration::from_secs(60))
                .await
                .unwrap();
        }

        let result = limiter
            .check_and_record(&key, 3, Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(AuthError::TooManyAttempts { .. })));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn window_slides() {
        let limiter = RedisRateLimiter::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        limiter
            .check_and_record(&key, 1, Duration::from_millis(200))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;

        // The earlier attempt has left the window.
        limiter
            .check_and_record(&key, 1, Duration::from_millis(200))
            .await
            .unwrap();
    }
}
