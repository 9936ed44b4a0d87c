//! PostgreSQL persistence for the boxoffice marketplace.
//!
//! One repository module per aggregate, all sharing a [`Database`] pool.
//! Queries are runtime-bound (`sqlx::query` / `query_as` with explicit
//! binds); rows are flat structs converted into the `boxoffice-core` domain
//! types at the module boundary. Inventory-sensitive paths (holds, order
//! settlement, payout requests) run inside transactions with conditional
//! updates or row locks, so invariants hold under concurrency without any
//! application-side locking.

pub mod error;
pub mod events;
pub mod orders;
pub mod payouts;
pub mod promos;
pub mod reservations;
pub mod stats;
pub mod tickets;
pub mod users;
pub mod webhooks;

pub use error::{Result, StoreError};

use boxoffice_core::money::Money;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connection settings for the marketplace database.
#[derive(Clone, Debug)]
pub struct PostgresSettings {
    /// Connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool.
    pub min_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout: u64,
    /// Idle timeout in seconds.
    pub idle_timeout: u64,
}

/// Shared handle to the marketplace database.
///
/// Cloning is cheap (the pool is reference-counted); repositories are
/// zero-cost views over the same pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects a pool with the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.connect_timeout))
            .idle_timeout(Duration::from_secs(settings.idle_timeout))
            .connect(&settings.url)
            .await?;

        tracing::info!(
            max_connections = settings.max_connections,
            "connected to PostgreSQL"
        );

        Ok(Self { pool })
    }

    /// Wraps an existing pool (tests).
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    /// Liveness probe for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// User accounts.
    #[must_use]
    pub fn users(&self) -> users::UserRepo {
        users::UserRepo::new(self.pool.clone())
    }

    /// Events and ticket types.
    #[must_use]
    pub fn events(&self) -> events::EventRepo {
        events::EventRepo::new(self.pool.clone())
    }

    /// Inventory holds.
    #[must_use]
    pub fn reservations(&self) -> reservations::ReservationRepo {
        reservations::ReservationRepo::new(self.pool.clone())
    }

    /// Orders and settlement.
    #[must_use]
    pub fn orders(&self) -> orders::OrderRepo {
        orders::OrderRepo::new(self.pool.clone())
    }

    /// Issued tickets.
    #[must_use]
    pub fn tickets(&self) -> tickets::TicketRepo {
        tickets::TicketRepo::new(self.pool.clone())
    }

    /// Promo codes.
    #[must_use]
    pub fn promos(&self) -> promos::PromoRepo {
        promos::PromoRepo::new(self.pool.clone())
    }

    /// Payouts and bank accounts.
    #[must_use]
    pub fn payouts(&self) -> payouts::PayoutRepo {
        payouts::PayoutRepo::new(self.pool.clone())
    }

    /// Webhook delivery dedupe.
    #[must_use]
    pub fn webhooks(&self) -> webhooks::WebhookRepo {
        webhooks::WebhookRepo::new(self.pool.clone())
    }

    /// Platform-wide aggregates for the admin console.
    #[must_use]
    pub fn stats(&self) -> stats::StatsRepo {
        stats::StatsRepo::new(self.pool.clone())
    }
}

/// Converts a domain amount to a BIGINT column value.
pub(crate) fn money_to_db(amount: Money) -> Result<i64> {
    i64::try_from(amount.minor())
        .map_err(|_| StoreError::Corrupt("amount exceeds BIGINT range".into()))
}

/// Converts a BIGINT column value to a domain amount.
pub(crate) fn money_from_db(value: i64) -> Result<Money> {
    u64::try_from(value)
        .map(Money::from_minor)
        .map_err(|_| StoreError::Corrupt("negative amount in database".into()))
}

/// Converts a domain quantity to an INTEGER column value.
pub(crate) fn quantity_to_db(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt("quantity exceeds INTEGER range".into()))
}

/// Converts an INTEGER column value to a domain quantity.
pub(crate) fn quantity_from_db(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt("negative quantity in database".into()))
}
