//! In-memory token store mock.

use crate::error::Result;
use crate::providers::{TokenData, TokenStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory [`TokenStore`] with single-use semantics.
#[derive(Default)]
pub struct MockTokenStore {
    tokens: Mutex<HashMap<String, TokenData>>,
}

impl MockTokenStore {
    /// Creates an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored token without consuming it (test assertions).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn peek(&self, token_id: &str) -> Option<TokenData> {
        self.tokens.lock().unwrap().get(token_id).cloned()
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)] // mock: lock poisoning is a test bug
impl TokenStore for MockTokenStore {
    async fn store_token(&self, token_id: &str, data: TokenData) -> Result<()> {
        self.tokens.lock().unwrap().insert(token_id.into(), data);
        Ok(())
    }

    async fn consume_token(&self, token_id: &str, secret: &str) -> Result<Option<TokenData>> {
        // Removal mirrors GETDEL: a wrong secret still burns the token.
        let data = self.tokens.lock().unwrap().remove(token_id);
        Ok(data.filter(|d| d.secret == secret && d.expires_at > chrono::Utc::now()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = MockTokenStore::new();
        store
            .store_token(
                "tok",
                TokenData {
                    email: "buyer@example.com".into(),
                    secret: "s3cret".into(),
                    expires_at: Utc::now() + Duration::minutes(15),
                },
            )
            .await
            .unwrap();

        assert!(store.consume_token("tok", "s3cret").await.unwrap().is_some());
        assert!(store.consume_token("tok", "s3cret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_token_is_refused() {
        let store = MockTokenStore::new();
        store
            .store_token(
                "tok",
                TokenData {
                    email: "buyer@example.com".into(),
                    secret: "s3cret".into(),
                    expires_at: Utc::now() - Duration::seconds(1),
                },
            )
            .await
            .unwrap();

        assert!(store.consume_token("tok", "s3cret").await.unwrap().is_none());
    }
}
