//! Reservation endpoints: take, list and release inventory holds.

use crate::error::AppError;
use crate::middleware::{RequireBuyer, SessionUser};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use boxoffice_core::event::EventStatus;
use boxoffice_core::ids::{EventId, ReservationId, TicketTypeId};
use boxoffice_core::money::Money;
use boxoffice_core::reservation::{Reservation, ReservationStatus};
use boxoffice_core::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to hold tickets.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Event to buy for.
    pub event_id: Uuid,
    /// Ticket type to hold.
    pub ticket_type_id: Uuid,
    /// Number of tickets.
    pub quantity: u32,
}

/// A hold as returned to the buyer.
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    /// Reservation id.
    pub id: Uuid,
    /// Event.
    pub event_id: Uuid,
    /// Ticket type.
    pub ticket_type_id: Uuid,
    /// Held quantity.
    pub quantity: u32,
    /// Unit price frozen at hold time.
    pub unit_price: Money,
    /// When the hold lapses (drives the checkout countdown).
    pub expires_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: *r.id.as_uuid(),
            event_id: *r.event_id.as_uuid(),
            ticket_type_id: *r.ticket_type_id.as_uuid(),
            quantity: r.quantity,
            unit_price: r.unit_price,
            expires_at: r.expires_at,
        }
    }
}

/// `POST /api/reservations` — hold tickets for checkout.
///
/// The event must have sales open and the ticket type must be inside its
/// sales window; the hold itself is the race-free oversell guard.
///
/// # Errors
///
/// Returns 409 when sold out, 422 for window/limit violations.
pub async fn create_reservation(
    RequireBuyer(buyer): RequireBuyer,
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let now = Utc::now();
    let event = state
        .db
        .events()
        .get(EventId::from_uuid(request.event_id))
        .await?;

    if event.status != EventStatus::SalesOpen {
        return Err(DomainError::SalesWindowClosed.into());
    }

    let ticket_type = state
        .db
        .events()
        .get_ticket_type(TicketTypeId::from_uuid(request.ticket_type_id))
        .await?;
    if ticket_type.event_id != event.id {
        return Err(AppError::not_found("ticket type"));
    }
    ticket_type.validate_request(request.quantity, now)?;

    let hold_ttl = Duration::seconds(i64::try_from(state.config.checkout.hold_ttl).unwrap_or(600));
    let reservation = Reservation {
        id: ReservationId::new(),
        event_id: event.id,
        ticket_type_id: ticket_type.id,
        buyer_id: buyer.user.id,
        quantity: request.quantity,
        unit_price: ticket_type.price,
        status: ReservationStatus::Active,
        expires_at: now + hold_ttl,
        created_at: now,
    };

    state.db.reservations().reserve(&reservation).await?;

    Ok((StatusCode::CREATED, Json(reservation.into())))
}

/// `GET /api/reservations` — the buyer's active holds.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn list_reservations(
    session_user: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let reservations = state
        .db
        .reservations()
        .list_active_by_buyer(session_user.user.id)
        .await?;

    Ok(Json(
        reservations.into_iter().map(ReservationResponse::from).collect(),
    ))
}

/// `DELETE /api/reservations/:id` — release a hold early.
///
/// # Errors
///
/// Returns 409 when the hold is no longer active.
pub async fn cancel_reservation(
    session_user: SessionUser,
    Path(reservation_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .reservations()
        .cancel(
            ReservationId::from_uuid(reservation_id),
            session_user.user.id,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
