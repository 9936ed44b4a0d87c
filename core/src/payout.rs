//! Organizer payouts and bank accounts.

use crate::ids::{BankAccountId, PayoutId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payout lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Requested by the organizer, awaiting admin approval.
    Pending,
    /// Approved; transfer initiated with the gateway.
    Processing,
    /// Transfer settled.
    Completed,
    /// Transfer failed or was reversed; the amount returns to the balance.
    Failed,
}

impl PayoutStatus {
    /// Stable string form used in database columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Statuses that count against the organizer's available balance.
    /// Failed payouts return the money.
    #[must_use]
    pub const fn withholds_balance(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payout status: {other}")),
        }
    }
}

/// A transfer of accumulated ticket revenue to an organizer's bank account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    /// Unique payout identifier.
    pub id: PayoutId,
    /// Organizer being paid.
    pub organizer_id: UserId,
    /// Amount transferred.
    pub amount: Money,
    /// Current status.
    pub status: PayoutStatus,
    /// Destination bank account.
    pub bank_account_id: BankAccountId,
    /// Gateway transfer reference, set once Processing.
    pub transfer_reference: Option<String>,
    /// When the organizer requested the payout.
    pub requested_at: DateTime<Utc>,
    /// When the transfer reached a terminal status.
    pub settled_at: Option<DateTime<Utc>>,
    /// Gateway failure reason, if failed.
    pub failure_reason: Option<String>,
}

/// An organizer's registered bank account.
///
/// Only a masked account number is ever stored; the gateway keeps the full
/// details behind its recipient code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Unique bank account identifier.
    pub id: BankAccountId,
    /// Organizer who owns the account.
    pub organizer_id: UserId,
    /// Bank's clearing code.
    pub bank_code: String,
    /// Account number with all but the last four digits masked.
    pub account_number_masked: String,
    /// Account holder name as resolved by the gateway.
    pub account_name: String,
    /// Gateway recipient code used for transfers.
    pub recipient_code: String,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// Masks an account number down to its last four digits.
#[must_use]
pub fn mask_account_number(account_number: &str) -> String {
    let len = account_number.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let visible: String = account_number.chars().skip(len - 4).collect();
    format!("{}{visible}", "*".repeat(len - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_account_number("0123456789"), "******6789");
        assert_eq!(mask_account_number("123"), "***");
    }

    #[test]
    fn failed_payouts_release_the_balance() {
        assert!(PayoutStatus::Pending.withholds_balance());
        assert!(PayoutStatus::Processing.withholds_balance());
        assert!(PayoutStatus::Completed.withholds_balance());
        assert!(!PayoutStatus::Failed.withholds_balance());
    }
}
