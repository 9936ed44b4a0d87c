//! Inventory holds taken during checkout.

use crate::error::DomainError;
use crate::ids::{EventId, ReservationId, TicketTypeId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an inventory hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Holding inventory, waiting for checkout.
    Active,
    /// Converted into an order; the hold now belongs to the order.
    Converted,
    /// The hold lapsed and the sweeper returned the inventory.
    Expired,
    /// The buyer released the hold.
    Cancelled,
}

impl ReservationStatus {
    /// Stable string form used in database columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Converted => "converted",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "converted" => Ok(Self::Converted),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// A temporary hold on ticket inventory.
///
/// The hold pins the unit price, so a price change between reserve and
/// checkout never surprises the buyer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier.
    pub id: ReservationId,
    /// Event being reserved.
    pub event_id: EventId,
    /// Ticket type being held.
    pub ticket_type_id: TicketTypeId,
    /// Buyer holding the reservation.
    pub buyer_id: UserId,
    /// Number of tickets held.
    pub quantity: u32,
    /// Unit price at the time the hold was taken.
    pub unit_price: Money,
    /// Current status.
    pub status: ReservationStatus,
    /// When the hold lapses.
    pub expires_at: DateTime<Utc>,
    /// When the hold was taken.
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the hold has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks that the reservation can be converted into an order at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ReservationNotActive`] unless the status is
    /// `Active`, or [`DomainError::ReservationExpired`] when the hold has
    /// lapsed (the sweeper may not have run yet; expiry is judged by the
    /// clock, not the status).
    pub fn ensure_convertible(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != ReservationStatus::Active {
            return Err(DomainError::ReservationNotActive);
        }
        if self.is_expired(now) {
            return Err(DomainError::ReservationExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reservation(status: ReservationStatus, expires_in: Duration) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: ReservationId::new(),
            event_id: EventId::new(),
            ticket_type_id: TicketTypeId::new(),
            buyer_id: UserId::new(),
            quantity: 2,
            unit_price: Money::from_minor(500_000),
            status,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn active_unexpired_hold_converts() {
        let r = reservation(ReservationStatus::Active, Duration::minutes(10));
        assert!(r.ensure_convertible(Utc::now()).is_ok());
    }

    #[test]
    fn lapsed_hold_is_rejected_even_before_the_sweep() {
        let r = reservation(ReservationStatus::Active, Duration::seconds(-1));
        assert_eq!(
            r.ensure_convertible(Utc::now()),
            Err(DomainError::ReservationExpired)
        );
    }

    #[test]
    fn converted_hold_cannot_convert_twice() {
        let r = reservation(ReservationStatus::Converted, Duration::minutes(10));
        assert_eq!(
            r.ensure_convertible(Utc::now()),
            Err(DomainError::ReservationNotActive)
        );
    }
}
