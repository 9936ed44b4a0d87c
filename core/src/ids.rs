//! Newtype identifiers for every aggregate.
//!
//! Each identifier wraps a UUID v4 and is its own type, so an `OrderId`
//! can never be passed where a `TicketId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner `Uuid`.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user account.
    UserId
);
define_id!(
    /// Unique identifier for an event.
    EventId
);
define_id!(
    /// Unique identifier for a ticket type within an event.
    TicketTypeId
);
define_id!(
    /// Unique identifier for an inventory hold.
    ReservationId
);
define_id!(
    /// Unique identifier for an order.
    OrderId
);
define_id!(
    /// Unique identifier for an issued ticket.
    TicketId
);
define_id!(
    /// Unique identifier for a promo code.
    PromoCodeId
);
define_id!(
    /// Unique identifier for a payout request.
    PayoutId
);
define_id!(
    /// Unique identifier for an organizer bank account.
    BankAccountId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_random() {
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn id_round_trips_through_uuid() {
        let id = EventId::new();
        assert_eq!(EventId::from_uuid(*id.as_uuid()), id);
    }

    #[test]
    fn id_serializes_transparently() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
