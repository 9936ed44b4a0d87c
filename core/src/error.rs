//! Error taxonomy for domain invariant violations.

use crate::event::EventStatus;
use crate::money::Money;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Violations of domain invariants.
///
/// These are business-rule failures, not infrastructure failures: every
/// variant corresponds to a request that was understood but cannot be
/// honored in the current state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested event status change is not in the transition table.
    #[error("cannot transition event from {from} to {to}")]
    IllegalTransition {
        /// Current status.
        from: EventStatus,
        /// Requested status.
        to: EventStatus,
    },

    /// Not enough unheld, unsold tickets remain.
    #[error("not enough tickets available")]
    SoldOut,

    /// The requested quantity exceeds the per-order limit.
    #[error("quantity exceeds the per-order limit of {limit}")]
    QuantityAboveLimit {
        /// Maximum quantity per order for this ticket type.
        limit: u32,
    },

    /// The ticket type is outside its sales window.
    #[error("ticket sales are not open")]
    SalesWindowClosed,

    /// The reservation hold has lapsed.
    #[error("reservation has expired")]
    ReservationExpired,

    /// The reservation was already converted, cancelled, or swept.
    #[error("reservation is no longer active")]
    ReservationNotActive,

    /// The promo code is not yet inside its validity window.
    #[error("promo code is not active yet")]
    PromoNotStarted,

    /// The promo code's validity window has passed.
    #[error("promo code has expired")]
    PromoExpired,

    /// The promo code's redemption cap has been reached.
    #[error("promo code has been fully redeemed")]
    PromoExhausted,

    /// The promo code belongs to a different event.
    #[error("promo code does not apply to this event")]
    PromoWrongEvent,

    /// The ticket was already checked in.
    #[error("ticket was already checked in at {at}")]
    AlreadyCheckedIn {
        /// When the first check-in happened.
        at: DateTime<Utc>,
    },

    /// The ticket was voided (its event was cancelled).
    #[error("ticket is void")]
    TicketVoid,

    /// A payout was requested for more than the available balance.
    #[error("insufficient balance: {available} available")]
    InsufficientBalance {
        /// Balance currently available for payout.
        available: Money,
    },

    /// Money arithmetic overflowed.
    #[error("amount arithmetic overflow")]
    ArithmeticOverflow,

    /// Request input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    /// Returns `true` for state conflicts (HTTP 409 territory), as opposed
    /// to malformed input or internal arithmetic failures.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::IllegalTransition { .. }
                | Self::SoldOut
                | Self::ReservationExpired
                | Self::ReservationNotActive
                | Self::PromoExhausted
                | Self::AlreadyCheckedIn { .. }
                | Self::TicketVoid
                | Self::InsufficientBalance { .. }
        )
    }
}
