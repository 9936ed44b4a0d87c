//! Issued ticket repository.

use crate::{Result, StoreError};
use boxoffice_core::ids::{EventId, OrderId, TicketId, TicketTypeId, UserId};
use boxoffice_core::ticket::Ticket;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    order_id: Uuid,
    event_id: Uuid,
    ticket_type_id: Uuid,
    buyer_id: Uuid,
    code: String,
    status: String,
    issued_at: DateTime<Utc>,
    checked_in_at: Option<DateTime<Utc>>,
}

const TICKET_COLUMNS: &str =
    "id, order_id, event_id, ticket_type_id, buyer_id, code, status, issued_at, checked_in_at";

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Ticket> {
        Ok(Ticket {
            id: TicketId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            event_id: EventId::from_uuid(row.event_id),
            ticket_type_id: TicketTypeId::from_uuid(row.ticket_type_id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            code: row.code,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            issued_at: row.issued_at,
            checked_in_at: row.checked_in_at,
        })
    }
}

/// Repository for issued tickets.
pub struct TicketRepo {
    pool: PgPool,
}

impl TicketRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A buyer's tickets, optionally narrowed to one event.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_buyer(
        &self,
        buyer_id: UserId,
        event_id: Option<EventId>,
    ) -> Result<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE buyer_id = $1 AND ($2::uuid IS NULL OR event_id = $2)
             ORDER BY issued_at DESC",
        ))
        .bind(buyer_id.as_uuid())
        .bind(event_id.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketRow::try_into).collect()
    }

    /// Tickets belonging to one order.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_order(&self, order_id: OrderId) -> Result<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 ORDER BY code",
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketRow::try_into).collect()
    }

    /// Checks a ticket in by admission code, exactly once.
    ///
    /// The row is locked while the status is examined, so two door scans
    /// of the same code serialize and the second sees `checked_in`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown code on this event,
    /// or the domain error for double check-ins and void tickets.
    pub async fn check_in(&self, event_id: EventId, code: &str) -> Result<Ticket> {
        let mut tx = self.pool.begin().await?;

        let row: Option<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE event_id = $1 AND code = $2
             FOR UPDATE",
        ))
        .bind(event_id.as_uuid())
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let ticket: Ticket = row.ok_or(StoreError::not_found("ticket"))?.try_into()?;
        ticket.ensure_checkable()?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE tickets SET status = 'checked_in', checked_in_at = $2 WHERE id = $1",
        )
        .bind(ticket.id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(ticket_id = %ticket.id, event_id = %event_id, "ticket checked in");

        Ok(Ticket {
            status: boxoffice_core::ticket::TicketStatus::CheckedIn,
            checked_in_at: Some(now),
            ..ticket
        })
    }

    /// Voids every valid ticket of an event (cancellation). Returns the
    /// number voided.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn void_for_event(&self, event_id: EventId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE tickets SET status = 'void'
             WHERE event_id = $1 AND status = 'valid'",
        )
        .bind(event_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
