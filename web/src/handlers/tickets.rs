//! Ticket endpoints: the buyer's wallet and door check-in.

use crate::error::AppError;
use crate::middleware::SessionUser;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use boxoffice_core::ids::EventId;
use boxoffice_core::ticket::{Ticket, TicketStatus};
use boxoffice_core::user::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters for listing tickets.
#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    /// Restrict to one event.
    pub event_id: Option<Uuid>,
}

/// A ticket as shown to its holder.
#[derive(Debug, Serialize)]
pub struct TicketView {
    /// Ticket id.
    pub id: Uuid,
    /// Event this ticket admits to.
    pub event_id: Uuid,
    /// Admission code.
    pub code: String,
    /// Current status.
    pub status: TicketStatus,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Check-in time, if scanned.
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: *ticket.id.as_uuid(),
            event_id: *ticket.event_id.as_uuid(),
            code: ticket.code,
            status: ticket.status,
            issued_at: ticket.issued_at,
            checked_in_at: ticket.checked_in_at,
        }
    }
}

/// `GET /api/tickets` — the buyer's tickets.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn list_tickets(
    session_user: SessionUser,
    Query(query): Query<ListTicketsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TicketView>>, AppError> {
    let tickets = state
        .db
        .tickets()
        .list_by_buyer(session_user.user.id, query.event_id.map(EventId::from_uuid))
        .await?;

    Ok(Json(tickets.into_iter().map(TicketView::from).collect()))
}

/// Request to check a ticket in at the door.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// The admission code on the ticket.
    pub code: String,
}

/// `POST /api/events/:id/check-in` — scan a ticket at the door.
///
/// Allowed for the event's organizer (acting as organizer) or an admin.
/// A ticket checks in exactly once; the second scan reports when the
/// first one happened.
///
/// # Errors
///
/// Returns 403 for other users, 404 for unknown codes, 409 for repeated
/// scans and void tickets.
pub async fn check_in(
    session_user: SessionUser,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<TicketView>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    let event = state.db.events().get(event_id).await?;

    let allowed = match session_user.session.active_role {
        Role::Admin => true,
        Role::Organizer => event.organizer_id == session_user.user.id,
        Role::Buyer => false,
    };
    if !allowed {
        return Err(AppError::forbidden("only the event organizer or an admin can check in"));
    }

    let code = request.code.trim().to_uppercase();
    let ticket = state.db.tickets().check_in(event_id, &code).await?;

    Ok(Json(ticket.into()))
}
