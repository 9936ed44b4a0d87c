//! Events, their lifecycle status machine, and ticket types.

use crate::error::DomainError;
use crate::ids::{EventId, TicketTypeId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event lifecycle status.
///
/// Transitions are enforced server-side by [`EventStatus::transition`]; the
/// storefront only ever sees events whose status
/// [`is_publicly_visible`](EventStatus::is_publicly_visible).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Being configured, not visible to the public.
    Draft,
    /// Announced, sales not yet open.
    Published,
    /// Tickets on sale.
    SalesOpen,
    /// Sales stopped (event approaching or sold out).
    SalesClosed,
    /// The event has taken place.
    Completed,
    /// Called off; tickets are void.
    Cancelled,
}

impl EventStatus {
    /// Legal transitions, the marketplace lifecycle:
    ///
    /// ```text
    /// Draft → Published → SalesOpen → SalesClosed → Completed
    ///            \            |            /
    ///             +------ Cancelled ------+
    /// ```
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Published)
                | (Self::Published, Self::SalesOpen)
                | (Self::SalesOpen, Self::SalesClosed)
                | (Self::SalesClosed, Self::Completed)
                | (
                    Self::Published | Self::SalesOpen | Self::SalesClosed,
                    Self::Cancelled
                )
        )
    }

    /// Validates a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::IllegalTransition`] if the transition is not
    /// in the table.
    pub fn transition(self, to: Self) -> Result<Self, DomainError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(DomainError::IllegalTransition { from: self, to })
        }
    }

    /// Whether the storefront lists events in this status.
    #[must_use]
    pub const fn is_publicly_visible(self) -> bool {
        matches!(self, Self::Published | Self::SalesOpen | Self::SalesClosed)
    }

    /// Whether the status admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Stable string form used in database columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::SalesOpen => "sales_open",
            Self::SalesClosed => "sales_closed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "sales_open" => Ok(Self::SalesOpen),
            "sales_closed" => Ok(Self::SalesClosed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// An event listed on the marketplace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Organizer who owns this event.
    pub organizer_id: UserId,
    /// Event title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Venue name.
    pub venue_name: String,
    /// Venue street address.
    pub venue_address: String,
    /// When the event starts.
    pub starts_at: DateTime<Utc>,
    /// When the event ends.
    pub ends_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: EventStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Validates the time window of an event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if `ends_at` is not after
    /// `starts_at`.
    pub fn validate_window(
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if ends_at > starts_at {
            Ok(())
        } else {
            Err(DomainError::InvalidInput(
                "event must end after it starts".into(),
            ))
        }
    }
}

/// A class of tickets sold for an event (e.g. "General", "VIP").
///
/// Inventory is tracked as three counters; `available` is always derived,
/// never stored, so the `reserved + sold ≤ total` invariant has a single
/// source of truth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    /// Unique ticket type identifier.
    pub id: TicketTypeId,
    /// Event this ticket type belongs to.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Price per ticket (zero for free events).
    pub price: Money,
    /// Total sellable quantity.
    pub quantity_total: u32,
    /// Quantity currently held by active reservations.
    pub quantity_reserved: u32,
    /// Quantity sold through paid orders.
    pub quantity_sold: u32,
    /// Maximum quantity a single order may contain.
    pub max_per_order: u32,
    /// When this ticket type goes on sale (`None` = with the event).
    pub sales_starts_at: Option<DateTime<Utc>>,
    /// When this ticket type leaves sale (`None` = with the event).
    pub sales_ends_at: Option<DateTime<Utc>>,
}

impl TicketType {
    /// Tickets neither held nor sold.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.quantity_total
            .saturating_sub(self.quantity_reserved)
            .saturating_sub(self.quantity_sold)
    }

    /// Whether this ticket type is inside its sales window at `now`.
    #[must_use]
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        let started = self.sales_starts_at.is_none_or(|t| now >= t);
        let not_ended = self.sales_ends_at.is_none_or(|t| now < t);
        started && not_ended
    }

    /// Validates a requested hold quantity against the per-order limit and
    /// the sales window.
    ///
    /// Availability itself is not checked here: that check belongs to the
    /// conditional update in the store, where it is race-free.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] for a zero quantity,
    /// [`DomainError::QuantityAboveLimit`] above `max_per_order`, or
    /// [`DomainError::SalesWindowClosed`] outside the sales window.
    pub fn validate_request(&self, quantity: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidInput("quantity must be positive".into()));
        }
        if quantity > self.max_per_order {
            return Err(DomainError::QuantityAboveLimit {
                limit: self.max_per_order,
            });
        }
        if !self.is_on_sale(now) {
            return Err(DomainError::SalesWindowClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ticket_type(total: u32, reserved: u32, sold: u32) -> TicketType {
        TicketType {
            id: TicketTypeId::new(),
            event_id: EventId::new(),
            name: "General".into(),
            price: Money::from_minor(500_000),
            quantity_total: total,
            quantity_reserved: reserved,
            quantity_sold: sold,
            max_per_order: 6,
            sales_starts_at: None,
            sales_ends_at: None,
        }
    }

    #[test]
    fn lifecycle_transitions_follow_the_table() {
        use EventStatus::{
            Cancelled, Completed, Draft, Published, SalesClosed, SalesOpen,
        };

        assert!(Draft.can_transition(Published));
        assert!(Published.can_transition(SalesOpen));
        assert!(SalesOpen.can_transition(SalesClosed));
        assert!(SalesClosed.can_transition(Completed));
        for from in [Published, SalesOpen, SalesClosed] {
            assert!(from.can_transition(Cancelled));
        }

        // A few of the illegal ones.
        assert!(!Draft.can_transition(SalesOpen));
        assert!(!Draft.can_transition(Cancelled));
        assert!(!SalesOpen.can_transition(Published));
        assert!(!Cancelled.can_transition(Published));
        assert!(!Completed.can_transition(Cancelled));
    }

    #[test]
    fn transition_reports_the_offending_pair() {
        let err = EventStatus::Draft.transition(EventStatus::Completed).unwrap_err();
        assert_eq!(
            err,
            DomainError::IllegalTransition {
                from: EventStatus::Draft,
                to: EventStatus::Completed,
            }
        );
    }

    #[test]
    fn draft_and_terminal_states_are_hidden_from_storefront() {
        assert!(!EventStatus::Draft.is_publicly_visible());
        assert!(!EventStatus::Cancelled.is_publicly_visible());
        assert!(EventStatus::SalesOpen.is_publicly_visible());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::SalesOpen,
            EventStatus::SalesClosed,
            EventStatus::Completed,
            EventStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>(), Ok(status));
        }
    }

    #[test]
    fn available_is_total_minus_held_and_sold() {
        assert_eq!(ticket_type(100, 10, 25).available(), 65);
        assert_eq!(ticket_type(10, 10, 0).available(), 0);
    }

    #[test]
    fn request_validation() {
        let now = Utc::now();
        let tt = ticket_type(100, 0, 0);

        assert!(tt.validate_request(2, now).is_ok());
        assert!(matches!(
            tt.validate_request(0, now),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(
            tt.validate_request(7, now),
            Err(DomainError::QuantityAboveLimit { limit: 6 })
        );

        let mut windowed = tt;
        windowed.sales_starts_at = Some(now + Duration::hours(1));
        assert_eq!(
            windowed.validate_request(1, now),
            Err(DomainError::SalesWindowClosed)
        );
    }

    #[test]
    fn event_window_must_be_ordered() {
        let now = Utc::now();
        assert!(Event::validate_window(now, now + Duration::hours(2)).is_ok());
        assert!(Event::validate_window(now, now).is_err());
    }
}
