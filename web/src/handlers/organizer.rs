//! Organizer dashboard endpoints: event CRUD, lifecycle transitions,
//! ticket types and promo codes.

use crate::error::AppError;
use crate::middleware::RequireOrganizer;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use boxoffice_core::event::{Event, EventStatus, TicketType};
use boxoffice_core::ids::{EventId, PromoCodeId, TicketTypeId};
use boxoffice_core::money::Money;
use boxoffice_core::promo::{Discount, PromoCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create an event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event title.
    pub title: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Venue name.
    pub venue_name: String,
    /// Venue street address.
    pub venue_address: String,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// End time.
    pub ends_at: DateTime<Utc>,
}

/// Request to update an event's details.
#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New venue name.
    pub venue_name: Option<String>,
    /// New venue address.
    pub venue_address: Option<String>,
    /// New start time.
    pub starts_at: Option<DateTime<Utc>>,
    /// New end time.
    pub ends_at: Option<DateTime<Utc>>,
}

/// Request to transition an event's status.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status.
    pub status: EventStatus,
}

/// An event as the organizer dashboard sees it.
#[derive(Debug, Serialize)]
pub struct OrganizerEventView {
    /// Event id.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// End time.
    pub ends_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for OrganizerEventView {
    fn from(event: Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            title: event.title,
            status: event.status,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            updated_at: event.updated_at,
        }
    }
}

/// Event detail with sales totals.
#[derive(Debug, Serialize)]
pub struct OrganizerEventDetail {
    /// The event.
    #[serde(flatten)]
    pub event: OrganizerEventView,
    /// Description.
    pub description: String,
    /// Venue name.
    pub venue_name: String,
    /// Venue address.
    pub venue_address: String,
    /// Tickets sold across paid orders.
    pub tickets_sold: u64,
    /// Gross ticket value of paid orders.
    pub gross: Money,
    /// Organizer revenue of paid orders.
    pub net_revenue: Money,
}

/// Loads an event and verifies the caller organizes it.
async fn owned_event(
    state: &AppState,
    organizer: &RequireOrganizer,
    event_id: Uuid,
) -> Result<Event, AppError> {
    let event = state.db.events().get(EventId::from_uuid(event_id)).await?;
    if event.organizer_id != organizer.0.user.id {
        // Foreign events are indistinguishable from missing ones.
        return Err(AppError::not_found("event"));
    }
    Ok(event)
}

/// `POST /api/organizer/events` — create a draft event.
///
/// # Errors
///
/// Returns 422 for an inverted time window.
pub async fn create_event(
    organizer: RequireOrganizer,
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<OrganizerEventView>), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    Event::validate_window(request.starts_at, request.ends_at)?;

    let now = Utc::now();
    let event = Event {
        id: EventId::new(),
        organizer_id: organizer.0.user.id,
        title: request.title,
        description: request.description,
        venue_name: request.venue_name,
        venue_address: request.venue_address,
        starts_at: request.starts_at,
        ends_at: request.ends_at,
        status: EventStatus::Draft,
        created_at: now,
        updated_at: now,
    };
    state.db.events().create(&event).await?;

    tracing::info!(event_id = %event.id, organizer_id = %event.organizer_id, "event created");

    Ok((StatusCode::CREATED, Json(event.into())))
}

/// `GET /api/organizer/events` — the organizer's events.
///
/// # Errors
///
/// Returns 403 unless acting as an organizer.
pub async fn list_events(
    organizer: RequireOrganizer,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrganizerEventView>>, AppError> {
    let events = state
        .db
        .events()
        .list_by_organizer(organizer.0.user.id)
        .await?;
    Ok(Json(events.into_iter().map(OrganizerEventView::from).collect()))
}

/// `GET /api/organizer/events/:id` — event detail with sales totals.
///
/// # Errors
///
/// Returns 404 for foreign events.
pub async fn get_event(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<OrganizerEventDetail>, AppError> {
    let event = owned_event(&state, &organizer, event_id).await?;
    let summary = state.db.events().sales_summary(event.id).await?;

    Ok(Json(OrganizerEventDetail {
        description: event.description.clone(),
        venue_name: event.venue_name.clone(),
        venue_address: event.venue_address.clone(),
        event: event.into(),
        tickets_sold: summary.tickets_sold,
        gross: summary.gross,
        net_revenue: summary.net_revenue,
    }))
}

/// `PUT /api/organizer/events/:id` — edit details (Draft/Published only).
///
/// # Errors
///
/// Returns 409 once the event is past editing.
pub async fn update_event(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<OrganizerEventView>, AppError> {
    let mut event = owned_event(&state, &organizer, event_id).await?;

    if !matches!(event.status, EventStatus::Draft | EventStatus::Published) {
        return Err(AppError::conflict("event is no longer editable"));
    }

    if let Some(title) = request.title {
        if title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        event.title = title;
    }
    if let Some(description) = request.description {
        event.description = description;
    }
    if let Some(venue_name) = request.venue_name {
        event.venue_name = venue_name;
    }
    if let Some(venue_address) = request.venue_address {
        event.venue_address = venue_address;
    }
    if let Some(starts_at) = request.starts_at {
        event.starts_at = starts_at;
    }
    if let Some(ends_at) = request.ends_at {
        event.ends_at = ends_at;
    }
    Event::validate_window(event.starts_at, event.ends_at)?;

    state.db.events().update_details(&event).await?;
    Ok(Json(event.into()))
}

/// `DELETE /api/organizer/events/:id` — delete a draft.
///
/// # Errors
///
/// Returns 409 for anything past Draft.
pub async fn delete_event(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let event = owned_event(&state, &organizer, event_id).await?;
    state.db.events().delete_draft(event.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/organizer/events/:id/status` — walk the lifecycle.
///
/// # Errors
///
/// Returns 409 for transitions not in the table.
pub async fn transition_event(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<OrganizerEventView>, AppError> {
    let mut event = owned_event(&state, &organizer, event_id).await?;

    // Validate against the transition table, then guard the write on the
    // status we validated from.
    let to = event.status.transition(request.status)?;
    state.db.events().set_status(event.id, event.status, to).await?;

    // Cancelling voids outstanding tickets and pending orders.
    if to == EventStatus::Cancelled {
        let voided = state.db.tickets().void_for_event(event.id).await?;
        let cancelled_orders = state.db.orders().cancel_pending_for_event(event.id).await?;
        tracing::info!(
            event_id = %event.id,
            voided,
            cancelled_orders,
            "event cancelled by organizer"
        );
    }

    event.status = to;
    Ok(Json(event.into()))
}

/// Request to create or update a ticket type.
#[derive(Debug, Deserialize)]
pub struct TicketTypeRequest {
    /// Display name.
    pub name: String,
    /// Price in minor units.
    pub price: u64,
    /// Total sellable quantity.
    pub quantity_total: u32,
    /// Per-order limit.
    pub max_per_order: u32,
    /// Sales window start.
    pub sales_starts_at: Option<DateTime<Utc>>,
    /// Sales window end.
    pub sales_ends_at: Option<DateTime<Utc>>,
}

/// A ticket type as the dashboard sees it.
#[derive(Debug, Serialize)]
pub struct TicketTypeResponse {
    /// Ticket type id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Price in minor units.
    pub price: Money,
    /// Total sellable quantity.
    pub quantity_total: u32,
    /// Currently held by reservations.
    pub quantity_reserved: u32,
    /// Sold.
    pub quantity_sold: u32,
    /// Per-order limit.
    pub max_per_order: u32,
}

impl From<TicketType> for TicketTypeResponse {
    fn from(tt: TicketType) -> Self {
        Self {
            id: *tt.id.as_uuid(),
            name: tt.name,
            price: tt.price,
            quantity_total: tt.quantity_total,
            quantity_reserved: tt.quantity_reserved,
            quantity_sold: tt.quantity_sold,
            max_per_order: tt.max_per_order,
        }
    }
}

fn validate_ticket_type_request(request: &TicketTypeRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    if request.quantity_total == 0 {
        return Err(AppError::validation("quantity must be positive"));
    }
    if request.max_per_order == 0 {
        return Err(AppError::validation("per-order limit must be positive"));
    }
    Ok(())
}

/// `POST /api/organizer/events/:id/ticket-types` — add a ticket class.
///
/// # Errors
///
/// Returns 422 for zero quantities or an empty name.
pub async fn create_ticket_type(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<TicketTypeRequest>,
) -> Result<(StatusCode, Json<TicketTypeResponse>), AppError> {
    let event = owned_event(&state, &organizer, event_id).await?;
    if event.status.is_terminal() {
        return Err(AppError::conflict("event is over"));
    }
    validate_ticket_type_request(&request)?;

    let ticket_type = TicketType {
        id: TicketTypeId::new(),
        event_id: event.id,
        name: request.name,
        price: Money::from_minor(request.price),
        quantity_total: request.quantity_total,
        quantity_reserved: 0,
        quantity_sold: 0,
        max_per_order: request.max_per_order,
        sales_starts_at: request.sales_starts_at,
        sales_ends_at: request.sales_ends_at,
    };
    state.db.events().create_ticket_type(&ticket_type).await?;

    Ok((StatusCode::CREATED, Json(ticket_type.into())))
}

/// `PUT /api/organizer/ticket-types/:id` — edit a ticket class before any
/// sales.
///
/// # Errors
///
/// Returns 409 once tickets have been sold.
pub async fn update_ticket_type(
    organizer: RequireOrganizer,
    Path(ticket_type_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<TicketTypeRequest>,
) -> Result<Json<TicketTypeResponse>, AppError> {
    let existing = state
        .db
        .events()
        .get_ticket_type(TicketTypeId::from_uuid(ticket_type_id))
        .await?;
    let _event = owned_event(&state, &organizer, *existing.event_id.as_uuid()).await?;
    validate_ticket_type_request(&request)?;

    let updated = TicketType {
        name: request.name,
        price: Money::from_minor(request.price),
        quantity_total: request.quantity_total,
        max_per_order: request.max_per_order,
        sales_starts_at: request.sales_starts_at,
        sales_ends_at: request.sales_ends_at,
        ..existing
    };
    state.db.events().update_ticket_type(&updated).await?;

    Ok(Json(updated.into()))
}

/// Request to create a promo code.
#[derive(Debug, Deserialize)]
pub struct CreatePromoRequest {
    /// The code buyers will type.
    pub code: String,
    /// Discount granted.
    pub discount: Discount,
    /// Validity window start.
    pub starts_at: Option<DateTime<Utc>>,
    /// Validity window end.
    pub ends_at: Option<DateTime<Utc>>,
    /// Redemption cap.
    pub max_redemptions: Option<u32>,
}

/// A promo code as the dashboard sees it.
#[derive(Debug, Serialize)]
pub struct PromoResponse {
    /// Promo code id.
    pub id: Uuid,
    /// The normalized code.
    pub code: String,
    /// Discount granted.
    pub discount: Discount,
    /// Redemptions taken.
    pub redemptions: u32,
    /// Redemption cap.
    pub max_redemptions: Option<u32>,
    /// Window end.
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<PromoCode> for PromoResponse {
    fn from(promo: PromoCode) -> Self {
        Self {
            id: *promo.id.as_uuid(),
            code: promo.code,
            discount: promo.discount,
            redemptions: promo.redemptions,
            max_redemptions: promo.max_redemptions,
            ends_at: promo.ends_at,
        }
    }
}

/// `POST /api/organizer/events/:id/promo-codes` — create a code.
///
/// # Errors
///
/// Returns 409 for duplicate codes, 422 for invalid discounts.
pub async fn create_promo(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<CreatePromoRequest>,
) -> Result<(StatusCode, Json<PromoResponse>), AppError> {
    let event = owned_event(&state, &organizer, event_id).await?;

    let code = PromoCode::normalize(&request.code);
    if code.is_empty() || code.len() > 64 {
        return Err(AppError::validation("code must be 1-64 characters"));
    }
    if let Discount::Percent { bps } = request.discount {
        if bps == 0 || bps > 10_000 {
            return Err(AppError::validation(
                "percent discount must be between 1 and 10000 basis points",
            ));
        }
    }

    let promo = PromoCode {
        id: PromoCodeId::new(),
        event_id: event.id,
        code,
        discount: request.discount,
        starts_at: request.starts_at,
        ends_at: request.ends_at,
        max_redemptions: request.max_redemptions,
        redemptions: 0,
        created_at: Utc::now(),
    };
    state.db.promos().create(&promo).await?;

    Ok((StatusCode::CREATED, Json(promo.into())))
}

/// `GET /api/organizer/events/:id/promo-codes` — list codes with
/// redemption counts.
///
/// # Errors
///
/// Returns 404 for foreign events.
pub async fn list_promos(
    organizer: RequireOrganizer,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PromoResponse>>, AppError> {
    let event = owned_event(&state, &organizer, event_id).await?;
    let promos = state.db.promos().list_by_event(event.id).await?;
    Ok(Json(promos.into_iter().map(PromoResponse::from).collect()))
}

/// `DELETE /api/organizer/promo-codes/:id` — deactivate a code.
///
/// Closes the validity window; existing redemptions stand.
///
/// # Errors
///
/// Returns 404 for foreign codes.
pub async fn deactivate_promo(
    organizer: RequireOrganizer,
    Path(promo_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    // Ownership runs through the event the code belongs to.
    let promo_id = PromoCodeId::from_uuid(promo_id);
    let promo = state.db.promos().get(promo_id).await?;
    let _event = owned_event(&state, &organizer, *promo.event_id.as_uuid()).await?;

    state.db.promos().deactivate(promo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ticket_type_request_validation() {
        let valid = TicketTypeRequest {
            name: "General".into(),
            price: 500_000,
            quantity_total: 100,
            max_per_order: 6,
            sales_starts_at: None,
            sales_ends_at: None,
        };
        assert!(validate_ticket_type_request(&valid).is_ok());

        let zero_quantity = TicketTypeRequest {
            quantity_total: 0,
            ..valid
        };
        assert!(validate_ticket_type_request(&zero_quantity).is_err());
    }

    #[test]
    fn discount_deserializes_tagged() {
        let percent: Discount =
            serde_json::from_str(r#"{"kind":"percent","bps":2500}"#).unwrap();
        assert_eq!(percent, Discount::Percent { bps: 2_500 });

        let fixed: Discount =
            serde_json::from_str(r#"{"kind":"fixed","amount":5000}"#).unwrap();
        assert_eq!(
            fixed,
            Discount::Fixed {
                amount: Money::from_minor(5_000)
            }
        );
    }
}
