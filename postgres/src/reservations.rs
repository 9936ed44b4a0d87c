//! Inventory hold repository.
//!
//! The hold is the oversell guard: a conditional update on the ticket
//! type's counters that only succeeds while enough unheld, unsold tickets
//! remain. Two buyers racing for the last ticket serialize on the row
//! update; exactly one conditional update matches.

use crate::{money_from_db, money_to_db, quantity_from_db, quantity_to_db, Result, StoreError};
use boxoffice_core::error::DomainError;
use boxoffice_core::ids::{EventId, ReservationId, TicketTypeId, UserId};
use boxoffice_core::reservation::Reservation;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
pub(crate) struct ReservationRow {
    pub(crate) id: Uuid,
    pub(crate) event_id: Uuid,
    pub(crate) ticket_type_id: Uuid,
    pub(crate) buyer_id: Uuid,
    pub(crate) quantity: i32,
    pub(crate) unit_price_minor: i64,
    pub(crate) status: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Reservation> {
        Ok(Reservation {
            id: ReservationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            ticket_type_id: TicketTypeId::from_uuid(row.ticket_type_id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            quantity: quantity_from_db(row.quantity)?,
            unit_price: money_from_db(row.unit_price_minor)?,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

/// Repository for inventory holds.
pub struct ReservationRepo {
    pool: PgPool,
}

impl ReservationRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Takes a hold on `quantity` tickets and records the reservation, in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::SoldOut`] (wrapped) when fewer than
    /// `quantity` tickets remain — the conditional update matched zero
    /// rows.
    pub async fn reserve(&self, reservation: &Reservation) -> Result<()> {
        let quantity = quantity_to_db(reservation.quantity)?;
        let mut tx = self.pool.begin().await?;

        let held = sqlx::query(
            "UPDATE ticket_types
             SET quantity_reserved = quantity_reserved + $2
             WHERE id = $1
               AND quantity_total - quantity_sold - quantity_reserved >= $2",
        )
        .bind(reservation.ticket_type_id.as_uuid())
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        if held.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::SoldOut));
        }

        sqlx::query(
            "INSERT INTO reservations
               (id, event_id, ticket_type_id, buyer_id, quantity, unit_price_minor,
                status, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.event_id.as_uuid())
        .bind(reservation.ticket_type_id.as_uuid())
        .bind(reservation.buyer_id.as_uuid())
        .bind(quantity)
        .bind(money_to_db(reservation.unit_price)?)
        .bind(reservation.status.as_str())
        .bind(reservation.expires_at)
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation.id,
            ticket_type_id = %reservation.ticket_type_id,
            quantity = reservation.quantity,
            "inventory hold taken"
        );

        Ok(())
    }

    /// Loads a reservation by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn get(&self, id: ReservationId) -> Result<Reservation> {
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT id, event_id, ticket_type_id, buyer_id, quantity, unit_price_minor,
                    status, expires_at, created_at
             FROM reservations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("reservation"))?.try_into()
    }

    /// Releases a buyer's own active hold.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ReservationNotActive`] (wrapped) if the hold
    /// is not this buyer's active reservation.
    pub async fn cancel(&self, id: ReservationId, buyer_id: UserId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let released: Option<(Uuid, i32)> = sqlx::query_as(
            "UPDATE reservations SET status = 'cancelled'
             WHERE id = $1 AND buyer_id = $2 AND status = 'active'
             RETURNING ticket_type_id, quantity",
        )
        .bind(id.as_uuid())
        .bind(buyer_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((ticket_type_id, quantity)) = released else {
            return Err(StoreError::Domain(DomainError::ReservationNotActive));
        };

        sqlx::query(
            "UPDATE ticket_types
             SET quantity_reserved = GREATEST(quantity_reserved - $2, 0)
             WHERE id = $1",
        )
        .bind(ticket_type_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = %id, "inventory hold released");
        Ok(())
    }

    /// Expires every active hold past its deadline and returns the held
    /// quantities to their ticket types, in one transaction. Returns the
    /// number of reservations expired.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let expired: Vec<(Uuid, i32)> = sqlx::query_as(
            "UPDATE reservations SET status = 'expired'
             WHERE status = 'active' AND expires_at < $1
             RETURNING ticket_type_id, quantity",
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        for (ticket_type_id, quantity) in &expired {
            sqlx::query(
                "UPDATE ticket_types
                 SET quantity_reserved = GREATEST(quantity_reserved - $2, 0)
                 WHERE id = $1",
            )
            .bind(ticket_type_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let count = expired.len() as u64;
        if count > 0 {
            tracing::info!(count, "expired reservations swept");
        }
        Ok(count)
    }

    /// A buyer's active holds, soonest expiry first.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_active_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            "SELECT id, event_id, ticket_type_id, buyer_id, quantity, unit_price_minor,
                    status, expires_at, created_at
             FROM reservations WHERE buyer_id = $1 AND status = 'active'
             ORDER BY expires_at ASC",
        )
        .bind(buyer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReservationRow::try_into).collect()
    }
}
