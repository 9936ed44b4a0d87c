//! Public storefront endpoints: browse and inspect events.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use boxoffice_core::event::{Event, EventStatus, TicketType};
use boxoffice_core::money::Money;
use boxoffice_postgres::events::StorefrontFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_PAGE_SIZE: usize = 100;

const fn default_page_size() -> usize {
    20
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Page number (0-indexed).
    #[serde(default)]
    pub page: usize,
    /// Page size (default 20, capped at 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Filter by status (must be a publicly visible status).
    pub status: Option<EventStatus>,
    /// Substring search on the title.
    pub search: Option<String>,
}

/// An event as the storefront sees it.
#[derive(Debug, Serialize)]
pub struct EventSummary {
    /// Event id.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Venue name.
    pub venue_name: String,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// End time.
    pub ends_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: EventStatus,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            title: event.title,
            venue_name: event.venue_name,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            status: event.status,
        }
    }
}

/// Paginated event listing.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    /// Events on this page.
    pub events: Vec<EventSummary>,
    /// Total matching events.
    pub total: u64,
    /// Current page.
    pub page: usize,
    /// Page size used.
    pub page_size: usize,
}

/// A ticket type with live availability.
#[derive(Debug, Serialize)]
pub struct TicketTypeView {
    /// Ticket type id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Price in minor units.
    pub price: Money,
    /// Tickets still available.
    pub available: u32,
    /// Per-order limit.
    pub max_per_order: u32,
    /// Whether the sales window is open right now.
    pub on_sale: bool,
}

impl TicketTypeView {
    fn from_ticket_type(tt: &TicketType, now: DateTime<Utc>) -> Self {
        Self {
            id: *tt.id.as_uuid(),
            name: tt.name.clone(),
            price: tt.price,
            available: tt.available(),
            max_per_order: tt.max_per_order,
            on_sale: tt.is_on_sale(now),
        }
    }
}

/// Full event detail with ticket types.
#[derive(Debug, Serialize)]
pub struct EventDetailResponse {
    /// Event id.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Venue name.
    pub venue_name: String,
    /// Venue address.
    pub venue_address: String,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// End time.
    pub ends_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Ticket types with availability.
    pub ticket_types: Vec<TicketTypeView>,
}

/// `GET /api/events` — list publicly visible events.
///
/// # Errors
///
/// Returns 422 for a filter on a non-public status.
pub async fn list_events(
    Query(query): Query<ListEventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListEventsResponse>, AppError> {
    if let Some(status) = query.status {
        if !status.is_publicly_visible() {
            return Err(AppError::validation(format!(
                "status {status} is not browsable"
            )));
        }
    }

    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
    let limit = page_size as i64;
    let offset = (query.page as i64).saturating_mul(limit);

    let filter = StorefrontFilter {
        status: query.status,
        search: query.search.clone(),
    };
    let (events, total) = state.db.events().list_public(&filter, limit, offset).await?;

    Ok(Json(ListEventsResponse {
        events: events.into_iter().map(EventSummary::from).collect(),
        total,
        page: query.page,
        page_size,
    }))
}

/// `GET /api/events/:id` — event detail with ticket availability.
///
/// Draft and cancelled events answer 404, not 403: the storefront does
/// not acknowledge their existence.
///
/// # Errors
///
/// Returns 404 for unknown or non-public events.
pub async fn get_event(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<EventDetailResponse>, AppError> {
    let event = state
        .db
        .events()
        .get(boxoffice_core::ids::EventId::from_uuid(event_id))
        .await?;

    if !event.status.is_publicly_visible() {
        return Err(AppError::not_found("event"));
    }

    let ticket_types = state.db.events().list_ticket_types(event.id).await?;
    let now = Utc::now();

    Ok(Json(EventDetailResponse {
        id: *event.id.as_uuid(),
        title: event.title,
        description: event.description,
        venue_name: event.venue_name,
        venue_address: event.venue_address,
        starts_at: event.starts_at,
        ends_at: event.ends_at,
        status: event.status,
        ticket_types: ticket_types
            .iter()
            .map(|tt| TicketTypeView::from_ticket_type(tt, now))
            .collect(),
    }))
}
