//! In-memory rate limiter mock.

use crate::error::{AuthError, Result};
use crate::providers::RateLimiter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory [`RateLimiter`] counting attempts per key.
///
/// The window is not modeled; tests drive the count directly.
#[derive(Default)]
pub struct MockRateLimiter {
    attempts: Mutex<HashMap<String, u32>>,
}

impl MockRateLimiter {
    /// Creates an empty mock limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)] // mock: lock poisoning is a test bug
impl RateLimiter for MockRateLimiter {
    async fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        let count = attempts.entry(key.into()).or_insert(0);
        if *count >= max_attempts {
            return Err(AuthError::TooManyAttempts {
                retry_after: window,
            });
        }
        *count += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limit_kicks_in_after_max_attempts() {
        let limiter = MockRateLimiter::new();
        for _ in 0..3 {
            limiter
                .check_and_record("k", 3, Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert!(matches!(
            limiter.check_and_record("k", 3, Duration::from_secs(60)).await,
            Err(AuthError::TooManyAttempts { .. })
        ));
    }
}
