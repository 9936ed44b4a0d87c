//! Checkout and order endpoints.
//!
//! Checkout converts a live reservation into a pending order (the
//! sequential subtotal → discount → platform fee → processing fee
//! arithmetic happens in the store transaction) and initializes a gateway
//! charge. Settlement arrives through the webhook, or through the verify
//! endpoint for clients returning from the redirect first.

use crate::error::AppError;
use crate::gateway::ChargeStatus;
use crate::middleware::{RequireBuyer, SessionUser};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use boxoffice_auth::providers::OrderConfirmation;
use boxoffice_core::ids::{OrderId, ReservationId};
use boxoffice_core::money::Money;
use boxoffice_core::order::{Order, OrderStatus, PricingBreakdown};
use boxoffice_core::promo::PromoCode;
use boxoffice_postgres::orders::CheckoutParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create an order from a reservation.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Reservation to convert.
    pub reservation_id: Uuid,
    /// Optional promo code.
    pub promo_code: Option<String>,
}

/// An order as returned to the buyer.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// Order id.
    pub id: Uuid,
    /// Event.
    pub event_id: Uuid,
    /// Number of tickets.
    pub quantity: u32,
    /// Pricing lines frozen at checkout.
    pub pricing: PricingBreakdown,
    /// Current status.
    pub status: OrderStatus,
    /// Gateway reference (for support inquiries).
    pub reference: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Payment time.
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: *order.id.as_uuid(),
            event_id: *order.event_id.as_uuid(),
            quantity: order.quantity,
            pricing: order.pricing,
            status: order.status,
            reference: order.gateway_reference,
            created_at: order.created_at,
            paid_at: order.paid_at,
        }
    }
}

/// Response after checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// The created order.
    pub order: OrderView,
    /// Where to complete payment (`None` for free orders, which are paid
    /// immediately).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
}

/// `POST /api/orders` — convert a reservation into an order.
///
/// # Errors
///
/// Returns 409 for consumed/expired reservations and exhausted promos,
/// 502 when the payment gateway refuses the charge setup.
pub async fn create_order(
    RequireBuyer(buyer): RequireBuyer,
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let reference = format!("bo_{}", Uuid::new_v4().simple());
    let fees = state.config.checkout.fee_schedule();
    let promo_code = request.promo_code.as_deref().map(PromoCode::normalize);

    let order = state
        .db
        .orders()
        .create_from_reservation(CheckoutParams {
            buyer_id: buyer.user.id,
            reservation_id: ReservationId::from_uuid(request.reservation_id),
            promo_code: promo_code.as_deref(),
            fees: &fees,
            gateway_reference: reference.clone(),
        })
        .await?;

    metrics::counter!("boxoffice_orders_created_total").increment(1);

    // Fully discounted orders never touch the gateway.
    if order.pricing.total.is_zero() {
        let settled = settle_and_notify(&state, &reference).await?;
        let order = settled.unwrap_or(order);
        return Ok((
            StatusCode::CREATED,
            Json(CheckoutResponse {
                order: order.into(),
                authorization_url: None,
            }),
        ));
    }

    let initialized = match state
        .gateway
        .initialize(&reference, order.pricing.total, buyer.email())
        .await
    {
        Ok(initialized) => initialized,
        Err(e) => {
            // The order cannot be paid without a gateway charge; fail it
            // now so the hold and promo go back.
            if let Err(release_err) = state.db.orders().mark_failed(&reference).await {
                tracing::error!(reference, error = %release_err, "failed to release failed order");
            }
            return Err(AppError::bad_gateway("payment setup failed").with_source(e.into()));
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: order.into(),
            authorization_url: Some(initialized.authorization_url),
        }),
    ))
}

/// Query parameters for listing orders.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Page number (0-indexed).
    #[serde(default)]
    pub page: usize,
    /// Page size (default 20, capped at 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

const fn default_page_size() -> usize {
    20
}

/// Paginated order listing.
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    /// Orders on this page.
    pub orders: Vec<OrderView>,
    /// Total orders for this buyer.
    pub total: u64,
    /// Current page.
    pub page: usize,
    /// Page size used.
    pub page_size: usize,
}

/// `GET /api/orders` — the buyer's orders.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn list_orders(
    session_user: SessionUser,
    Query(query): Query<ListOrdersQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListOrdersResponse>, AppError> {
    let page_size = query.page_size.clamp(1, 100);
    let limit = page_size as i64;
    let offset = (query.page as i64).saturating_mul(limit);

    let (orders, total) = state
        .db
        .orders()
        .list_by_buyer(session_user.user.id, limit, offset)
        .await?;

    Ok(Json(ListOrdersResponse {
        orders: orders.into_iter().map(OrderView::from).collect(),
        total,
        page: query.page,
        page_size,
    }))
}

/// Order detail, with ticket codes once paid.
#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    /// The order.
    #[serde(flatten)]
    pub order: OrderView,
    /// Issued ticket codes (paid orders only).
    pub ticket_codes: Vec<String>,
}

/// `GET /api/orders/:id` — one of the buyer's orders.
///
/// # Errors
///
/// Returns 404 for unknown or foreign orders.
pub async fn get_order(
    session_user: SessionUser,
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let order = state.db.orders().get(OrderId::from_uuid(order_id)).await?;
    if order.buyer_id != session_user.user.id {
        return Err(AppError::not_found("order"));
    }

    let ticket_codes = if order.status == OrderStatus::Paid {
        state
            .db
            .tickets()
            .list_by_order(order.id)
            .await?
            .into_iter()
            .map(|t| t.code)
            .collect()
    } else {
        Vec::new()
    };

    Ok(Json(OrderDetailResponse {
        order: order.into(),
        ticket_codes,
    }))
}

/// `POST /api/orders/:id/verify` — re-check the charge with the gateway.
///
/// For clients that return from the payment redirect before the webhook
/// lands. Settles or fails the order exactly like the webhook would.
///
/// # Errors
///
/// Returns 404 for foreign orders, 409 on an amount mismatch, 502 when
/// the gateway is unreachable.
pub async fn verify_order(
    session_user: SessionUser,
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<OrderView>, AppError> {
    let order = state.db.orders().get(OrderId::from_uuid(order_id)).await?;
    if order.buyer_id != session_user.user.id {
        return Err(AppError::not_found("order"));
    }

    if order.status != OrderStatus::Pending {
        return Ok(Json(order.into()));
    }

    let status = state
        .gateway
        .verify(&order.gateway_reference)
        .await
        .map_err(|e| AppError::bad_gateway("payment verification failed").with_source(e.into()))?;

    let settled = match status {
        ChargeStatus::Success { amount } => {
            if amount != order.pricing.total {
                tracing::warn!(
                    order_id = %order.id,
                    expected = %order.pricing.total,
                    got = %amount,
                    "gateway amount mismatch on verify"
                );
                return Err(AppError::conflict("charged amount does not match the order"));
            }
            settle_and_notify(&state, &order.gateway_reference).await?
        }
        ChargeStatus::Failed { reason } => {
            tracing::info!(order_id = %order.id, reason, "charge failed on verify");
            state.db.orders().mark_failed(&order.gateway_reference).await?
        }
        ChargeStatus::Pending => None,
    };

    let order = match settled {
        Some(order) => order,
        None => state.db.orders().get(OrderId::from_uuid(order_id)).await?,
    };

    Ok(Json(order.into()))
}

/// Settles an order as paid and emails the confirmation.
///
/// Shared by the webhook, the verify endpoint and free-order checkout.
/// Settlement is transactional in the store; the email happens after the
/// commit and never rolls a payment back.
pub(crate) async fn settle_and_notify(
    state: &AppState,
    reference: &str,
) -> Result<Option<Order>, AppError> {
    let Some((order, tickets)) = state.db.orders().settle_paid(reference).await? else {
        return Ok(None);
    };

    metrics::counter!("boxoffice_orders_paid_total").increment(1);

    let confirmation = build_confirmation(state, &order, tickets.iter().map(|t| t.code.clone()))
        .await;
    match confirmation {
        Ok((email, confirmation)) => {
            if let Err(e) = state.email.send_order_confirmation(&email, &confirmation).await {
                tracing::error!(order_id = %order.id, error = %e, "confirmation email failed");
            }
        }
        Err(e) => {
            tracing::error!(order_id = %order.id, error = %e, "could not build confirmation email");
        }
    }

    Ok(Some(order))
}

async fn build_confirmation(
    state: &AppState,
    order: &Order,
    ticket_codes: impl Iterator<Item = String>,
) -> Result<(String, OrderConfirmation), AppError> {
    let buyer = state.db.users().get(order.buyer_id).await?;
    let event = state.db.events().get(order.event_id).await?;
    let ticket_type = state.db.events().get_ticket_type(order.ticket_type_id).await?;

    Ok((
        buyer.email,
        OrderConfirmation {
            event_title: event.title,
            ticket_type: ticket_type.name,
            quantity: order.quantity,
            total: order.pricing.total,
            ticket_codes: ticket_codes.collect(),
        },
    ))
}

/// Ensures a webhook-reported amount matches the order before settling.
pub(crate) async fn settle_checked(
    state: &AppState,
    reference: &str,
    reported_amount: Money,
) -> Result<Option<Order>, AppError> {
    let order = state.db.orders().get_by_reference(reference).await?;
    if order.status == OrderStatus::Pending && reported_amount != order.pricing.total {
        tracing::warn!(
            order_id = %order.id,
            expected = %order.pricing.total,
            got = %reported_amount,
            "webhook amount mismatch, refusing settlement"
        );
        return Err(AppError::conflict("charged amount does not match the order"));
    }
    settle_and_notify(state, reference).await
}
