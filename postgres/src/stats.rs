//! Platform-wide aggregates for the admin console.

use crate::{money_from_db, Result};
use boxoffice_core::money::Money;
use sqlx::PgPool;
use std::collections::HashMap;

/// Platform totals shown on the admin dashboard.
#[derive(Clone, Debug, Default)]
pub struct PlatformStats {
    /// Registered users.
    pub users: u64,
    /// Events per status.
    pub events_by_status: HashMap<String, u64>,
    /// Orders per status.
    pub orders_by_status: HashMap<String, u64>,
    /// Gross buyer volume across paid orders.
    pub gross_volume: Money,
    /// Platform fee revenue across paid orders.
    pub platform_fee_revenue: Money,
}

/// Repository for platform aggregates.
pub struct StatsRepo {
    pool: PgPool,
}

impl StatsRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Computes the platform totals.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn platform(&self) -> Result<PlatformStats> {
        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let event_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM events GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let order_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let (gross, fees): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_minor), 0)::bigint,
                    COALESCE(SUM(platform_fee_minor), 0)::bigint
             FROM orders WHERE status = 'paid'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            users: users.unsigned_abs(),
            events_by_status: event_rows
                .into_iter()
                .map(|(s, c)| (s, c.unsigned_abs()))
                .collect(),
            orders_by_status: order_rows
                .into_iter()
                .map(|(s, c)| (s, c.unsigned_abs()))
                .collect(),
            gross_volume: money_from_db(gross)?,
            platform_fee_revenue: money_from_db(fees)?,
        })
    }
}
