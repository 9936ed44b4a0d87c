//! User accounts and roles.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A role a user may hold.
///
/// A user holds a set of roles but acts under exactly one at a time (the
/// session's active role). Everyone starts as a buyer; the organizer role
/// is self-service; admin is granted out of band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Purchases tickets through the storefront.
    Buyer,
    /// Creates and manages events, receives payouts.
    Organizer,
    /// Moderates users, events and payouts.
    Admin,
}

impl Role {
    /// Stable string form used in database columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Login email (unique, lowercased).
    pub email: String,
    /// Display name shown on orders and events.
    pub display_name: Option<String>,
    /// Roles this user holds.
    pub roles: Vec<Role>,
    /// Suspended users fail session validation.
    pub suspended: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns `true` if the user holds the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Buyer, Role::Organizer, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
