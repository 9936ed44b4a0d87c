//! Order repository: checkout, settlement, and failure paths.
//!
//! Every money-moving step is one transaction:
//! - checkout locks the reservation row, redeems the promo with a
//!   conditional increment, and inserts the order;
//! - settlement flips the order `pending → paid` with a guarded update,
//!   moves the hold from reserved to sold, and issues tickets;
//! - failure releases the hold and the promo redemption.
//!
//! Guarded updates (`WHERE status = 'pending'`) make webhook replays
//! no-ops instead of double-settlements.

use crate::promos::{PromoRow, PROMO_COLUMNS};
use crate::reservations::ReservationRow;
use crate::{money_from_db, money_to_db, quantity_from_db, quantity_to_db, Result, StoreError};
use boxoffice_core::error::DomainError;
use boxoffice_core::ids::{
    EventId, OrderId, PromoCodeId, ReservationId, TicketId, TicketTypeId, UserId,
};
use boxoffice_core::money::Money;
use boxoffice_core::order::{FeeSchedule, Order, PricingBreakdown};
use boxoffice_core::promo::PromoCode;
use boxoffice_core::reservation::Reservation;
use boxoffice_core::ticket::{self, Ticket, TicketStatus};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    event_id: Uuid,
    ticket_type_id: Uuid,
    reservation_id: Uuid,
    quantity: i32,
    subtotal_minor: i64,
    discount_minor: i64,
    platform_fee_minor: i64,
    processing_fee_minor: i64,
    total_minor: i64,
    promo_code_id: Option<Uuid>,
    status: String,
    gateway_reference: String,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

const ORDER_COLUMNS: &str = "id, buyer_id, event_id, ticket_type_id, reservation_id, quantity, \
     subtotal_minor, discount_minor, platform_fee_minor, processing_fee_minor, total_minor, \
     promo_code_id, status, gateway_reference, created_at, paid_at";

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            event_id: EventId::from_uuid(row.event_id),
            ticket_type_id: TicketTypeId::from_uuid(row.ticket_type_id),
            reservation_id: ReservationId::from_uuid(row.reservation_id),
            quantity: quantity_from_db(row.quantity)?,
            pricing: PricingBreakdown {
                subtotal: money_from_db(row.subtotal_minor)?,
                discount: money_from_db(row.discount_minor)?,
                platform_fee: money_from_db(row.platform_fee_minor)?,
                processing_fee: money_from_db(row.processing_fee_minor)?,
                total: money_from_db(row.total_minor)?,
            },
            promo_code_id: row.promo_code_id.map(PromoCodeId::from_uuid),
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            gateway_reference: row.gateway_reference,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

/// Parameters for [`OrderRepo::create_from_reservation`].
pub struct CheckoutParams<'a> {
    /// The buyer placing the order (must own the reservation).
    pub buyer_id: UserId,
    /// Reservation to convert.
    pub reservation_id: ReservationId,
    /// Normalized promo code, if one was supplied.
    pub promo_code: Option<&'a str>,
    /// Fee schedule from configuration.
    pub fees: &'a FeeSchedule,
    /// Gateway reference to record on the order.
    pub gateway_reference: String,
}

/// Repository for orders.
pub struct OrderRepo {
    pool: PgPool,
}

impl OrderRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Converts a reservation into a pending order, running the checkout
    /// arithmetic and redeeming the promo code, all in one transaction.
    ///
    /// # Errors
    ///
    /// Domain errors for an expired/foreign/consumed reservation or an
    /// invalid promo; [`StoreError::NotFound`] for an unknown promo code.
    pub async fn create_from_reservation(&self, params: CheckoutParams<'_>) -> Result<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Lock the reservation row for the whole checkout; a concurrent
        // checkout of the same reservation blocks here and then fails the
        // status guard.
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT id, event_id, ticket_type_id, buyer_id, quantity, unit_price_minor,
                    status, expires_at, created_at
             FROM reservations WHERE id = $1
             FOR UPDATE",
        )
        .bind(params.reservation_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let reservation: Reservation =
            row.ok_or(StoreError::not_found("reservation"))?.try_into()?;

        if reservation.buyer_id != params.buyer_id {
            return Err(StoreError::not_found("reservation"));
        }
        reservation.ensure_convertible(now)?;

        let subtotal = reservation
            .unit_price
            .checked_mul(reservation.quantity)
            .ok_or(DomainError::ArithmeticOverflow)?;

        let (discount, promo_code_id) = match params.promo_code {
            Some(code) => {
                let (promo, discount) =
                    Self::redeem_promo(&mut tx, reservation.event_id, code, subtotal, now).await?;
                (discount, Some(promo.id))
            }
            None => (Money::ZERO, None),
        };

        let pricing =
            PricingBreakdown::compute(reservation.unit_price, reservation.quantity, discount, params.fees)?;

        let converted = sqlx::query(
            "UPDATE reservations SET status = 'converted'
             WHERE id = $1 AND status = 'active'",
        )
        .bind(reservation.id.as_uuid())
        .execute(&mut *tx)
        .await?;
        if converted.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::ReservationNotActive));
        }

        let order = Order {
            id: OrderId::new(),
            buyer_id: params.buyer_id,
            event_id: reservation.event_id,
            ticket_type_id: reservation.ticket_type_id,
            reservation_id: reservation.id,
            quantity: reservation.quantity,
            pricing,
            promo_code_id,
            status: boxoffice_core::order::OrderStatus::Pending,
            gateway_reference: params.gateway_reference,
            created_at: now,
            paid_at: None,
        };

        sqlx::query(
            "INSERT INTO orders
               (id, buyer_id, event_id, ticket_type_id, reservation_id, quantity,
                subtotal_minor, discount_minor, platform_fee_minor, processing_fee_minor,
                total_minor, promo_code_id, status, gateway_reference, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.event_id.as_uuid())
        .bind(order.ticket_type_id.as_uuid())
        .bind(order.reservation_id.as_uuid())
        .bind(quantity_to_db(order.quantity)?)
        .bind(money_to_db(order.pricing.subtotal)?)
        .bind(money_to_db(order.pricing.discount)?)
        .bind(money_to_db(order.pricing.platform_fee)?)
        .bind(money_to_db(order.pricing.processing_fee)?)
        .bind(money_to_db(order.pricing.total)?)
        .bind(order.promo_code_id.map(|id| *id.as_uuid()))
        .bind(order.status.as_str())
        .bind(&order.gateway_reference)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            reservation_id = %order.reservation_id,
            total = %order.pricing.total,
            "order created"
        );

        Ok(order)
    }

    /// Validates and redeems a promo code inside the checkout transaction.
    async fn redeem_promo(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        code: &str,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<(PromoCode, Money)> {
        let row: Option<PromoRow> = sqlx::query_as(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes
             WHERE event_id = $1 AND code = $2
             FOR UPDATE",
        ))
        .bind(event_id.as_uuid())
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;

        let promo: PromoCode = row.ok_or(StoreError::not_found("promo code"))?.try_into()?;
        promo.validate(event_id, now)?;

        // The cap is enforced here, not in the pre-check: the conditional
        // increment is what makes concurrent redemptions honest.
        let redeemed = sqlx::query(
            "UPDATE promo_codes SET redemptions = redemptions + 1
             WHERE id = $1
               AND (max_redemptions IS NULL OR redemptions < max_redemptions)",
        )
        .bind(promo.id.as_uuid())
        .execute(&mut **tx)
        .await?;
        if redeemed.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::PromoExhausted));
        }

        let discount = promo.discount_for(subtotal)?;
        Ok((promo, discount))
    }

    /// Settles an order as paid: guarded status flip, inventory
    /// `reserved → sold`, ticket issuance — one transaction.
    ///
    /// Returns `Ok(None)` when the order exists but is not pending
    /// (idempotent webhook replay).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown reference.
    pub async fn settle_paid(&self, reference: &str) -> Result<Option<(Order, Vec<Ticket>)>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = 'paid', paid_at = $2
             WHERE gateway_reference = $1 AND status = 'pending'
             RETURNING {ORDER_COLUMNS}",
        ))
        .bind(reference)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            // Distinguish replay from a reference we have never seen.
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM orders WHERE gateway_reference = $1")
                    .bind(reference)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match exists {
                Some(_) => Ok(None),
                None => Err(StoreError::not_found("order")),
            };
        };

        let order: Order = row.try_into()?;
        let quantity = quantity_to_db(order.quantity)?;

        sqlx::query(
            "UPDATE ticket_types
             SET quantity_reserved = GREATEST(quantity_reserved - $2, 0),
                 quantity_sold = quantity_sold + $2
             WHERE id = $1",
        )
        .bind(order.ticket_type_id.as_uuid())
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        let tickets = Self::issue_tickets(&mut tx, &order, now).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            reference,
            tickets = tickets.len(),
            "order settled as paid"
        );

        Ok(Some((order, tickets)))
    }

    /// Issues one ticket row per purchased unit, retrying code collisions.
    async fn issue_tickets(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::with_capacity(order.quantity as usize);

        for _ in 0..order.quantity {
            let mut attempts = 0;
            loop {
                let code = ticket::generate_code(&mut rand::thread_rng());
                let ticket = Ticket {
                    id: TicketId::new(),
                    order_id: order.id,
                    event_id: order.event_id,
                    ticket_type_id: order.ticket_type_id,
                    buyer_id: order.buyer_id,
                    code,
                    status: TicketStatus::Valid,
                    issued_at: now,
                    checked_in_at: None,
                };

                let inserted = sqlx::query(
                    "INSERT INTO tickets
                       (id, order_id, event_id, ticket_type_id, buyer_id, code, status, issued_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     ON CONFLICT (code) DO NOTHING",
                )
                .bind(ticket.id.as_uuid())
                .bind(ticket.order_id.as_uuid())
                .bind(ticket.event_id.as_uuid())
                .bind(ticket.ticket_type_id.as_uuid())
                .bind(ticket.buyer_id.as_uuid())
                .bind(&ticket.code)
                .bind(ticket.status.as_str())
                .bind(ticket.issued_at)
                .execute(&mut **tx)
                .await?;

                if inserted.rows_affected() == 1 {
                    tickets.push(ticket);
                    break;
                }

                attempts += 1;
                if attempts >= 5 {
                    return Err(StoreError::Conflict(
                        "could not generate a unique ticket code".into(),
                    ));
                }
            }
        }

        Ok(tickets)
    }

    /// Marks a pending order failed and releases its inventory hold and
    /// promo redemption. `Ok(None)` when the order is not pending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown reference.
    pub async fn mark_failed(&self, reference: &str) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = 'failed'
             WHERE gateway_reference = $1 AND status = 'pending'
             RETURNING {ORDER_COLUMNS}",
        ))
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM orders WHERE gateway_reference = $1")
                    .bind(reference)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match exists {
                Some(_) => Ok(None),
                None => Err(StoreError::not_found("order")),
            };
        };

        let order: Order = row.try_into()?;
        Self::release_order_resources(&mut tx, &order).await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, reference, "order marked failed");

        Ok(Some(order))
    }

    /// Cancels every pending order of an event (admin force-cancel),
    /// releasing holds and redemptions. Returns the number cancelled.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn cancel_pending_for_event(&self, event_id: EventId) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = 'cancelled'
             WHERE event_id = $1 AND status = 'pending'
             RETURNING {ORDER_COLUMNS}",
        ))
        .bind(event_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let mut cancelled = 0u64;
        for row in rows {
            let order: Order = row.try_into()?;
            Self::release_order_resources(&mut tx, &order).await?;
            cancelled += 1;
        }

        tx.commit().await?;
        Ok(cancelled)
    }

    /// Returns a pending order's hold and promo redemption.
    async fn release_order_resources(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE ticket_types
             SET quantity_reserved = GREATEST(quantity_reserved - $2, 0)
             WHERE id = $1",
        )
        .bind(order.ticket_type_id.as_uuid())
        .bind(quantity_to_db(order.quantity)?)
        .execute(&mut **tx)
        .await?;

        if let Some(promo_id) = order.promo_code_id {
            sqlx::query(
                "UPDATE promo_codes SET redemptions = GREATEST(redemptions - 1, 0)
                 WHERE id = $1",
            )
            .bind(promo_id.as_uuid())
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Loads an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1",
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("order"))?.try_into()
    }

    /// Loads an order by gateway reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn get_by_reference(&self, reference: &str) -> Result<Order> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_reference = $1",
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("order"))?.try_into()
    }

    /// A buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_buyer(
        &self,
        buyer_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, u64)> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        ))
        .bind(buyer_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE buyer_id = $1")
                .bind(buyer_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        let orders = rows
            .into_iter()
            .map(OrderRow::try_into)
            .collect::<Result<Vec<_>>>()?;

        Ok((orders, total.unsigned_abs()))
    }
}
