//! Promo code repository.

use crate::{money_from_db, money_to_db, quantity_from_db, quantity_to_db, Result, StoreError};
use boxoffice_core::ids::{EventId, PromoCodeId};
use boxoffice_core::promo::{Discount, PromoCode};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
pub(crate) struct PromoRow {
    pub(crate) id: Uuid,
    pub(crate) event_id: Uuid,
    pub(crate) code: String,
    pub(crate) discount_kind: String,
    pub(crate) discount_bps: Option<i32>,
    pub(crate) discount_amount_minor: Option<i64>,
    pub(crate) starts_at: Option<DateTime<Utc>>,
    pub(crate) ends_at: Option<DateTime<Utc>>,
    pub(crate) max_redemptions: Option<i32>,
    pub(crate) redemptions: i32,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<PromoRow> for PromoCode {
    type Error = StoreError;

    fn try_from(row: PromoRow) -> Result<PromoCode> {
        let discount = match row.discount_kind.as_str() {
            "percent" => Discount::Percent {
                bps: row
                    .discount_bps
                    .ok_or_else(|| StoreError::Corrupt("percent promo without bps".into()))
                    .and_then(quantity_from_db)?,
            },
            "fixed" => Discount::Fixed {
                amount: row
                    .discount_amount_minor
                    .ok_or_else(|| StoreError::Corrupt("fixed promo without amount".into()))
                    .and_then(money_from_db)?,
            },
            other => {
                return Err(StoreError::Corrupt(format!("unknown discount kind: {other}")));
            }
        };

        Ok(PromoCode {
            id: PromoCodeId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            code: row.code,
            discount,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            max_redemptions: row
                .max_redemptions
                .map(quantity_from_db)
                .transpose()?,
            redemptions: quantity_from_db(row.redemptions)?,
            created_at: row.created_at,
        })
    }
}

pub(crate) const PROMO_COLUMNS: &str = "id, event_id, code, discount_kind, discount_bps, \
     discount_amount_minor, starts_at, ends_at, max_redemptions, redemptions, created_at";

/// Repository for promo codes.
pub struct PromoRepo {
    pool: PgPool,
}

impl PromoRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a promo code. Codes are unique per event, case-insensitively
    /// (the caller stores them normalized).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the code already exists for
    /// the event.
    pub async fn create(&self, promo: &PromoCode) -> Result<()> {
        let (kind, bps, amount) = match promo.discount {
            Discount::Percent { bps } => ("percent", Some(quantity_to_db(bps)?), None),
            Discount::Fixed { amount } => ("fixed", None, Some(money_to_db(amount)?)),
        };

        sqlx::query(
            "INSERT INTO promo_codes
               (id, event_id, code, discount_kind, discount_bps, discount_amount_minor,
                starts_at, ends_at, max_redemptions, redemptions, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(promo.id.as_uuid())
        .bind(promo.event_id.as_uuid())
        .bind(&promo.code)
        .bind(kind)
        .bind(bps)
        .bind(amount)
        .bind(promo.starts_at)
        .bind(promo.ends_at)
        .bind(promo.max_redemptions.map(quantity_to_db).transpose()?)
        .bind(quantity_to_db(promo.redemptions)?)
        .bind(promo.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if StoreError::is_unique_violation(&e) {
                StoreError::Conflict("promo code already exists for this event".into())
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(())
    }

    /// Finds a promo code by event and normalized code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn find_by_code(&self, event_id: EventId, code: &str) -> Result<PromoCode> {
        let row: Option<PromoRow> = sqlx::query_as(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE event_id = $1 AND code = $2",
        ))
        .bind(event_id.as_uuid())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("promo code"))?.try_into()
    }

    /// All promo codes of an event, with live redemption counts.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_event(&self, event_id: EventId) -> Result<Vec<PromoCode>> {
        let rows: Vec<PromoRow> = sqlx::query_as(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE event_id = $1
             ORDER BY created_at DESC",
        ))
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PromoRow::try_into).collect()
    }

    /// Loads one promo code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn get(&self, id: PromoCodeId) -> Result<PromoCode> {
        let row: Option<PromoRow> = sqlx::query_as(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE id = $1",
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("promo code"))?.try_into()
    }

    /// Deactivates a code by closing its validity window now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the code does not exist.
    pub async fn deactivate(&self, id: PromoCodeId) -> Result<()> {
        let result = sqlx::query("UPDATE promo_codes SET ends_at = now() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("promo code"));
        }
        Ok(())
    }
}
