//! Event and ticket type repository.

use crate::{money_from_db, money_to_db, quantity_from_db, quantity_to_db, Result, StoreError};
use boxoffice_core::event::{Event, EventStatus, TicketType};
use boxoffice_core::ids::{EventId, TicketTypeId, UserId};
use boxoffice_core::money::Money;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: String,
    venue_name: String,
    venue_address: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Event> {
        Ok(Event {
            id: EventId::from_uuid(row.id),
            organizer_id: UserId::from_uuid(row.organizer_id),
            title: row.title,
            description: row.description,
            venue_name: row.venue_name,
            venue_address: row.venue_address,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TicketTypeRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    price_minor: i64,
    quantity_total: i32,
    quantity_reserved: i32,
    quantity_sold: i32,
    max_per_order: i32,
    sales_starts_at: Option<DateTime<Utc>>,
    sales_ends_at: Option<DateTime<Utc>>,
}

impl TryFrom<TicketTypeRow> for TicketType {
    type Error = StoreError;

    fn try_from(row: TicketTypeRow) -> Result<TicketType> {
        Ok(TicketType {
            id: TicketTypeId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            name: row.name,
            price: money_from_db(row.price_minor)?,
            quantity_total: quantity_from_db(row.quantity_total)?,
            quantity_reserved: quantity_from_db(row.quantity_reserved)?,
            quantity_sold: quantity_from_db(row.quantity_sold)?,
            max_per_order: quantity_from_db(row.max_per_order)?,
            sales_starts_at: row.sales_starts_at,
            sales_ends_at: row.sales_ends_at,
        })
    }
}

/// Filters for the public storefront listing.
#[derive(Clone, Debug, Default)]
pub struct StorefrontFilter {
    /// Restrict to one status (must be publicly visible).
    pub status: Option<EventStatus>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
}

/// Per-event sales totals for the organizer dashboard.
#[derive(Clone, Copy, Debug, Default)]
pub struct SalesSummary {
    /// Tickets sold across paid orders.
    pub tickets_sold: u64,
    /// Gross ticket value of paid orders (before discounts).
    pub gross: Money,
    /// Organizer revenue (subtotal minus discount) of paid orders.
    pub net_revenue: Money,
}

/// Repository for events and their ticket types.
pub struct EventRepo {
    pool: PgPool,
}

impl EventRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new draft event.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn create(&self, event: &Event) -> Result<()> {
        sqlx::query(
            "INSERT INTO events
               (id, organizer_id, title, description, venue_name, venue_address,
                starts_at, ends_at, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue_name)
        .bind(&event.venue_address)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the event does not exist.
    pub async fn get(&self, id: EventId) -> Result<Event> {
        let row: Option<EventRow> = sqlx::query_as(
            "SELECT id, organizer_id, title, description, venue_name, venue_address,
                    starts_at, ends_at, status, created_at, updated_at
             FROM events WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("event"))?.try_into()
    }

    /// Rewrites the editable details of an event.
    ///
    /// The caller is responsible for the editability rule (Draft or
    /// Published only); the status guard here closes the race against a
    /// concurrent transition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the event moved out of an
    /// editable status concurrently.
    pub async fn update_details(&self, event: &Event) -> Result<()> {
        let result = sqlx::query(
            "UPDATE events
             SET title = $2, description = $3, venue_name = $4, venue_address = $5,
                 starts_at = $6, ends_at = $7, updated_at = now()
             WHERE id = $1 AND status IN ('draft', 'published')",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue_name)
        .bind(&event.venue_address)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(
                "event is no longer editable".into(),
            ));
        }
        Ok(())
    }

    /// Moves an event from `from` to `to`.
    ///
    /// The transition table is validated by the caller against
    /// [`EventStatus::can_transition`]; the `WHERE status = from` guard
    /// makes the change safe under concurrent transitions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the event is no longer in
    /// `from`.
    pub async fn set_status(&self, id: EventId, from: EventStatus, to: EventStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE events SET status = $3, updated_at = now()
             WHERE id = $1 AND status = $2",
        )
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "event is no longer {from}"
            )));
        }

        tracing::info!(event_id = %id, %from, %to, "event status changed");
        Ok(())
    }

    /// Deletes a draft event. Non-drafts are cancelled, never deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the event is not a draft.
    pub async fn delete_draft(&self, id: EventId) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND status = 'draft'")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict("only draft events can be deleted".into()));
        }
        Ok(())
    }

    /// Storefront listing: publicly visible events, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_public(
        &self,
        filter: &StorefrontFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Event>, u64)> {
        let status = filter.status.map(EventStatus::as_str);
        let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));

        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, organizer_id, title, description, venue_name, venue_address,
                    starts_at, ends_at, status, created_at, updated_at
             FROM events
             WHERE status IN ('published', 'sales_open', 'sales_closed')
               AND ($1::text IS NULL OR status = $1)
               AND ($2::text IS NULL OR title ILIKE $2)
             ORDER BY starts_at ASC
             LIMIT $3 OFFSET $4",
        )
        .bind(status)
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM events
             WHERE status IN ('published', 'sales_open', 'sales_closed')
               AND ($1::text IS NULL OR status = $1)
               AND ($2::text IS NULL OR title ILIKE $2)",
        )
        .bind(status)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let events = rows
            .into_iter()
            .map(EventRow::try_into)
            .collect::<Result<Vec<_>>>()?;

        Ok((events, total.unsigned_abs()))
    }

    /// All events of one organizer, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_organizer(&self, organizer_id: UserId) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, organizer_id, title, description, venue_name, venue_address,
                    starts_at, ends_at, status, created_at, updated_at
             FROM events WHERE organizer_id = $1
             ORDER BY created_at DESC",
        )
        .bind(organizer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::try_into).collect()
    }

    /// Paid-order sales totals for one event.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn sales_summary(&self, event_id: EventId) -> Result<SalesSummary> {
        let (tickets_sold, gross, net): (i64, i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(quantity), 0)::bigint,
                    COALESCE(SUM(subtotal_minor), 0)::bigint,
                    COALESCE(SUM(subtotal_minor - discount_minor), 0)::bigint
             FROM orders WHERE event_id = $1 AND status = 'paid'",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesSummary {
            tickets_sold: tickets_sold.unsigned_abs(),
            gross: money_from_db(gross)?,
            net_revenue: money_from_db(net)?,
        })
    }

    /// Inserts a ticket type.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn create_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        sqlx::query(
            "INSERT INTO ticket_types
               (id, event_id, name, price_minor, quantity_total, quantity_reserved,
                quantity_sold, max_per_order, sales_starts_at, sales_ends_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(ticket_type.id.as_uuid())
        .bind(ticket_type.event_id.as_uuid())
        .bind(&ticket_type.name)
        .bind(money_to_db(ticket_type.price)?)
        .bind(quantity_to_db(ticket_type.quantity_total)?)
        .bind(quantity_to_db(ticket_type.quantity_reserved)?)
        .bind(quantity_to_db(ticket_type.quantity_sold)?)
        .bind(quantity_to_db(ticket_type.max_per_order)?)
        .bind(ticket_type.sales_starts_at)
        .bind(ticket_type.sales_ends_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Updates price, quantity and sales window of a ticket type, allowed
    /// only while nothing has been sold.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] once tickets have been sold.
    pub async fn update_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        let result = sqlx::query(
            "UPDATE ticket_types
             SET name = $2, price_minor = $3, quantity_total = $4, max_per_order = $5,
                 sales_starts_at = $6, sales_ends_at = $7
             WHERE id = $1 AND quantity_sold = 0",
        )
        .bind(ticket_type.id.as_uuid())
        .bind(&ticket_type.name)
        .bind(money_to_db(ticket_type.price)?)
        .bind(quantity_to_db(ticket_type.quantity_total)?)
        .bind(quantity_to_db(ticket_type.max_per_order)?)
        .bind(ticket_type.sales_starts_at)
        .bind(ticket_type.sales_ends_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(
                "ticket type can no longer be edited".into(),
            ));
        }
        Ok(())
    }

    /// Loads one ticket type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn get_ticket_type(&self, id: TicketTypeId) -> Result<TicketType> {
        let row: Option<TicketTypeRow> = sqlx::query_as(
            "SELECT id, event_id, name, price_minor, quantity_total, quantity_reserved,
                    quantity_sold, max_per_order, sales_starts_at, sales_ends_at
             FROM ticket_types WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("ticket type"))?.try_into()
    }

    /// All ticket types of an event.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_ticket_types(&self, event_id: EventId) -> Result<Vec<TicketType>> {
        let rows: Vec<TicketTypeRow> = sqlx::query_as(
            "SELECT id, event_id, name, price_minor, quantity_total, quantity_reserved,
                    quantity_sold, max_per_order, sales_starts_at, sales_ends_at
             FROM ticket_types WHERE event_id = $1
             ORDER BY price_minor ASC",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketTypeRow::try_into).collect()
    }
}
