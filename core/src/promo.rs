//! Promo codes: per-event discounts with a validity window and usage cap.

use crate::error::DomainError;
use crate::ids::{EventId, PromoCodeId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The discount a promo code grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    /// A basis-point percentage off the subtotal (2_500 = 25%).
    Percent {
        /// Discount in basis points, at most 10_000.
        bps: u32,
    },
    /// A fixed amount off, clamped to the subtotal.
    Fixed {
        /// Discount amount.
        amount: Money,
    },
}

/// A discount code scoped to a single event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Unique promo code identifier.
    pub id: PromoCodeId,
    /// Event this code applies to.
    pub event_id: EventId,
    /// The code buyers type, stored uppercased.
    pub code: String,
    /// What the code grants.
    pub discount: Discount,
    /// Start of the validity window (`None` = immediately).
    pub starts_at: Option<DateTime<Utc>>,
    /// End of the validity window (`None` = never).
    pub ends_at: Option<DateTime<Utc>>,
    /// Redemption cap (`None` = unlimited).
    pub max_redemptions: Option<u32>,
    /// Redemptions taken so far.
    pub redemptions: u32,
    /// When the code was created.
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Validates the code for an order on `event_id` at `now`.
    ///
    /// The cap check here is advisory: the authoritative cap enforcement is
    /// the conditional increment in the store. This pre-check exists so the
    /// common failure modes produce their specific errors instead of a
    /// generic conflict.
    ///
    /// # Errors
    ///
    /// Returns the matching [`DomainError`] when the code belongs to another
    /// event, is outside its window, or has no redemptions left.
    pub fn validate(&self, event_id: EventId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.event_id != event_id {
            return Err(DomainError::PromoWrongEvent);
        }
        if self.starts_at.is_some_and(|t| now < t) {
            return Err(DomainError::PromoNotStarted);
        }
        if self.ends_at.is_some_and(|t| now >= t) {
            return Err(DomainError::PromoExpired);
        }
        if self
            .max_redemptions
            .is_some_and(|cap| self.redemptions >= cap)
        {
            return Err(DomainError::PromoExhausted);
        }
        Ok(())
    }

    /// Computes the discount against a subtotal.
    ///
    /// A fixed discount never exceeds the subtotal; a percent discount is
    /// rounded down.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ArithmeticOverflow`] if the percentage
    /// computation overflows.
    pub fn discount_for(&self, subtotal: Money) -> Result<Money, DomainError> {
        match self.discount {
            Discount::Percent { bps } => subtotal
                .bps(bps.min(10_000))
                .ok_or(DomainError::ArithmeticOverflow),
            Discount::Fixed { amount } => Ok(amount.min(subtotal)),
        }
    }

    /// Normalizes a user-supplied code for storage and lookup.
    #[must_use]
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(discount: Discount) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(),
            event_id: EventId::new(),
            code: "LAUNCH25".into(),
            discount,
            starts_at: None,
            ends_at: None,
            max_redemptions: Some(100),
            redemptions: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percent_discount_rounds_down() {
        let p = promo(Discount::Percent { bps: 2_500 });
        assert_eq!(
            p.discount_for(Money::from_minor(999)).unwrap(),
            Money::from_minor(249)
        );
    }

    #[test]
    fn fixed_discount_clamps_to_subtotal() {
        let p = promo(Discount::Fixed {
            amount: Money::from_minor(5_000),
        });
        assert_eq!(
            p.discount_for(Money::from_minor(3_000)).unwrap(),
            Money::from_minor(3_000)
        );
    }

    #[test]
    fn window_and_cap_checks() {
        let now = Utc::now();
        let mut p = promo(Discount::Percent { bps: 1_000 });
        let event_id = p.event_id;

        assert!(p.validate(event_id, now).is_ok());

        assert_eq!(
            p.validate(EventId::new(), now),
            Err(DomainError::PromoWrongEvent)
        );

        p.starts_at = Some(now + Duration::hours(1));
        assert_eq!(p.validate(event_id, now), Err(DomainError::PromoNotStarted));
        p.starts_at = None;

        p.ends_at = Some(now - Duration::hours(1));
        assert_eq!(p.validate(event_id, now), Err(DomainError::PromoExpired));
        p.ends_at = None;

        p.redemptions = 100;
        assert_eq!(p.validate(event_id, now), Err(DomainError::PromoExhausted));
    }

    #[test]
    fn normalization_uppercases_and_trims() {
        assert_eq!(PromoCode::normalize("  launch25 "), "LAUNCH25");
    }
}
