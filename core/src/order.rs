//! Orders and checkout fee arithmetic.
//!
//! The pricing sequence is fixed: subtotal, promo discount, platform fee,
//! processing fee, total — every step in minor units with checked
//! arithmetic, so an overflowing input surfaces as a domain error instead
//! of a wrapped amount.

use crate::error::DomainError;
use crate::ids::{EventId, OrderId, PromoCodeId, ReservationId, TicketTypeId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment.
    Pending,
    /// Payment confirmed; tickets issued.
    Paid,
    /// Payment declined or abandoned; inventory released.
    Failed,
    /// Cancelled before payment.
    Cancelled,
    /// Paid, then refunded.
    Refunded,
}

impl OrderStatus {
    /// Stable string form used in database columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Marketplace fee parameters, loaded from configuration.
///
/// Defaults mirror a Paystack-style schedule: a percentage plus a flat
/// amount, with the processing fee capped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Platform fee percentage in basis points.
    pub platform_fee_bps: u32,
    /// Flat platform fee per order.
    pub platform_fee_flat: Money,
    /// Processing fee percentage in basis points.
    pub processing_fee_bps: u32,
    /// Flat processing fee per order.
    pub processing_fee_flat: Money,
    /// Cap on the processing fee (`None` = uncapped).
    pub processing_fee_cap: Option<Money>,
}

/// The line-by-line result of the checkout arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// `unit_price × quantity`.
    pub subtotal: Money,
    /// Promo discount applied to the subtotal.
    pub discount: Money,
    /// Marketplace's cut.
    pub platform_fee: Money,
    /// Payment processor's cut.
    pub processing_fee: Money,
    /// What the buyer pays.
    pub total: Money,
}

impl PricingBreakdown {
    /// Runs the checkout arithmetic.
    ///
    /// Fees are computed on the discounted subtotal; the processing fee is
    /// additionally computed on top of the platform fee (the processor
    /// charges on the full amount moved) and capped. A fully discounted
    /// order carries no fees at all.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ArithmeticOverflow`] if any step overflows,
    /// and [`DomainError::InvalidInput`] if the discount exceeds the
    /// subtotal.
    pub fn compute(
        unit_price: Money,
        quantity: u32,
        discount: Money,
        fees: &FeeSchedule,
    ) -> Result<Self, DomainError> {
        let subtotal = unit_price
            .checked_mul(quantity)
            .ok_or(DomainError::ArithmeticOverflow)?;

        let discounted = subtotal
            .checked_sub(discount)
            .ok_or_else(|| DomainError::InvalidInput("discount exceeds subtotal".into()))?;

        if discounted.is_zero() {
            return Ok(Self {
                subtotal,
                discount,
                platform_fee: Money::ZERO,
                processing_fee: Money::ZERO,
                total: Money::ZERO,
            });
        }

        let platform_fee = discounted
            .bps(fees.platform_fee_bps)
            .and_then(|f| f.checked_add(fees.platform_fee_flat))
            .ok_or(DomainError::ArithmeticOverflow)?;

        let fee_base = discounted
            .checked_add(platform_fee)
            .ok_or(DomainError::ArithmeticOverflow)?;
        let mut processing_fee = fee_base
            .bps(fees.processing_fee_bps)
            .and_then(|f| f.checked_add(fees.processing_fee_flat))
            .ok_or(DomainError::ArithmeticOverflow)?;
        if let Some(cap) = fees.processing_fee_cap {
            processing_fee = processing_fee.min(cap);
        }

        let total = fee_base
            .checked_add(processing_fee)
            .ok_or(DomainError::ArithmeticOverflow)?;

        Ok(Self {
            subtotal,
            discount,
            platform_fee,
            processing_fee,
            total,
        })
    }

    /// The organizer's share: subtotal minus discount. Platform and
    /// processing fees are never the organizer's money.
    #[must_use]
    pub fn organizer_revenue(&self) -> Money {
        self.subtotal
            .checked_sub(self.discount)
            .unwrap_or(Money::ZERO)
    }
}

/// A checkout order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Buyer who placed the order.
    pub buyer_id: UserId,
    /// Event the tickets are for.
    pub event_id: EventId,
    /// Ticket type purchased.
    pub ticket_type_id: TicketTypeId,
    /// Reservation this order converted.
    pub reservation_id: ReservationId,
    /// Number of tickets.
    pub quantity: u32,
    /// Pricing lines frozen at checkout.
    pub pricing: PricingBreakdown,
    /// Promo code redeemed, if any.
    pub promo_code_id: Option<PromoCodeId>,
    /// Current status.
    pub status: OrderStatus,
    /// Payment gateway reference for this order.
    pub gateway_reference: String,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // 5% + 100 platform, 1.5% + 100 processing capped at 2_000 — all in
    // minor units.
    const FEES: FeeSchedule = FeeSchedule {
        platform_fee_bps: 500,
        platform_fee_flat: Money::from_minor(100),
        processing_fee_bps: 150,
        processing_fee_flat: Money::from_minor(100),
        processing_fee_cap: Some(Money::from_minor(2_000)),
    };

    #[test]
    fn pricing_sequence_without_discount() {
        // 2 × 10_000 = 20_000; platform 5% + 100 = 1_100;
        // processing 1.5% of 21_100 + 100 = 416; total 21_516.
        let p = PricingBreakdown::compute(Money::from_minor(10_000), 2, Money::ZERO, &FEES)
            .unwrap();
        assert_eq!(p.subtotal, Money::from_minor(20_000));
        assert_eq!(p.platform_fee, Money::from_minor(1_100));
        assert_eq!(p.processing_fee, Money::from_minor(416));
        assert_eq!(p.total, Money::from_minor(21_516));
        assert_eq!(p.organizer_revenue(), Money::from_minor(20_000));
    }

    #[test]
    fn discount_reduces_the_fee_base() {
        // Subtotal 20_000, discount 5_000 → fees computed on 15_000.
        let p = PricingBreakdown::compute(
            Money::from_minor(10_000),
            2,
            Money::from_minor(5_000),
            &FEES,
        )
        .unwrap();
        assert_eq!(p.platform_fee, Money::from_minor(850));
        // 1.5% of 15_850 = 237 (+100) = 337.
        assert_eq!(p.processing_fee, Money::from_minor(337));
        assert_eq!(p.total, Money::from_minor(16_187));
        assert_eq!(p.organizer_revenue(), Money::from_minor(15_000));
    }

    #[test]
    fn processing_fee_is_capped() {
        // 1.5% of a large order blows past the 2_000 cap.
        let p = PricingBreakdown::compute(Money::from_minor(10_000_000), 1, Money::ZERO, &FEES)
            .unwrap();
        assert_eq!(p.processing_fee, Money::from_minor(2_000));
    }

    #[test]
    fn fully_discounted_order_is_free() {
        let p = PricingBreakdown::compute(
            Money::from_minor(5_000),
            1,
            Money::from_minor(5_000),
            &FEES,
        )
        .unwrap();
        assert_eq!(p.total, Money::ZERO);
        assert_eq!(p.platform_fee, Money::ZERO);
        assert_eq!(p.processing_fee, Money::ZERO);
    }

    #[test]
    fn oversized_discount_is_rejected() {
        let err = PricingBreakdown::compute(
            Money::from_minor(1_000),
            1,
            Money::from_minor(2_000),
            &FEES,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let err =
            PricingBreakdown::compute(Money::from_minor(u64::MAX), 2, Money::ZERO, &FEES)
                .unwrap_err();
        assert_eq!(err, DomainError::ArithmeticOverflow);
    }
}
