//! Issued tickets and their check-in lifecycle.

use crate::error::DomainError;
use crate::ids::{EventId, OrderId, TicketId, TicketTypeId, UserId};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters used in ticket codes. Ambiguous glyphs (I, L, O, 0, 1) are
/// excluded so codes survive being read over the phone at the door.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Ticket status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Issued and usable.
    Valid,
    /// Scanned at the door.
    CheckedIn,
    /// Invalidated (event cancelled or order refunded).
    Void,
}

impl TicketStatus {
    /// Stable string form used in database columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::CheckedIn => "checked_in",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Self::Valid),
            "checked_in" => Ok(Self::CheckedIn),
            "void" => Ok(Self::Void),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// A single admission ticket, issued when its order is paid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket identifier.
    pub id: TicketId,
    /// Order that paid for this ticket.
    pub order_id: OrderId,
    /// Event this ticket admits to.
    pub event_id: EventId,
    /// Ticket type.
    pub ticket_type_id: TicketTypeId,
    /// Ticket holder.
    pub buyer_id: UserId,
    /// Human-readable admission code, unique across the platform.
    pub code: String,
    /// Current status.
    pub status: TicketStatus,
    /// When the ticket was issued.
    pub issued_at: DateTime<Utc>,
    /// When the ticket was checked in.
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Validates a check-in attempt.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AlreadyCheckedIn`] with the original check-in
    /// time on a second scan, or [`DomainError::TicketVoid`] for voided
    /// tickets.
    pub fn ensure_checkable(&self) -> Result<(), DomainError> {
        match self.status {
            TicketStatus::Valid => Ok(()),
            TicketStatus::CheckedIn => Err(DomainError::AlreadyCheckedIn {
                at: self.checked_in_at.unwrap_or(self.issued_at),
            }),
            TicketStatus::Void => Err(DomainError::TicketVoid),
        }
    }
}

/// Generates a random admission code in `XXXX-XXXX-XXXX` form.
///
/// Codes are drawn from a 31-character alphabet (~59 bits of entropy);
/// uniqueness is enforced by the database index and callers retry on the
/// collision path.
#[must_use]
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(14);
    for i in 0..12 {
        if i > 0 && i % 4 == 0 {
            code.push('-');
        }
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(char::from(CODE_ALPHABET[idx]));
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_grouped_shape() {
        let mut rng = rand::thread_rng();
        let code = generate_code(&mut rng);
        assert_eq!(code.len(), 14);
        let groups: Vec<&str> = code.split('-').collect();
        assert_eq!(groups.len(), 3);
        for group in groups {
            assert_eq!(group.len(), 4);
            assert!(group.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn code_avoids_ambiguous_characters() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert!(!code.contains(['I', 'L', 'O', '0', '1']));
        }
    }

    #[test]
    fn double_check_in_names_the_first_scan() {
        let scanned_at = Utc::now();
        let ticket = Ticket {
            id: TicketId::new(),
            order_id: OrderId::new(),
            event_id: EventId::new(),
            ticket_type_id: TicketTypeId::new(),
            buyer_id: UserId::new(),
            code: "ABCD-EFGH-JKMN".into(),
            status: TicketStatus::CheckedIn,
            issued_at: scanned_at,
            checked_in_at: Some(scanned_at),
        };
        assert_eq!(
            ticket.ensure_checkable(),
            Err(DomainError::AlreadyCheckedIn { at: scanned_at })
        );
    }
}
