//! Webhook delivery dedupe.
//!
//! Gateways redeliver webhooks; every delivery is recorded under
//! `(reference, kind)` with a unique constraint, and only the first
//! insertion wins. Processing is keyed off that outcome, so replays are
//! acknowledged without re-running side effects.

use crate::Result;
use sqlx::PgPool;

/// Repository for webhook delivery records.
pub struct WebhookRepo {
    pool: PgPool,
}

impl WebhookRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a delivery. Returns `true` if this is the first time the
    /// `(reference, kind)` pair has been seen.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn record(&self, reference: &str, kind: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO webhook_events (reference, kind)
             VALUES ($1, $2)
             ON CONFLICT (reference, kind) DO NOTHING",
        )
        .bind(reference)
        .bind(kind)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
