//! Payout and bank account repository.
//!
//! The balance check and the payout insert share a transaction holding a
//! row lock on the organizer's user row, so two concurrent requests cannot
//! both pass the check and overdraw the balance.

use crate::{money_from_db, money_to_db, Result, StoreError};
use boxoffice_core::error::DomainError;
use boxoffice_core::ids::{BankAccountId, PayoutId, UserId};
use boxoffice_core::money::Money;
use boxoffice_core::payout::{BankAccount, Payout, PayoutStatus};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(FromRow)]
struct PayoutRow {
    id: Uuid,
    organizer_id: Uuid,
    amount_minor: i64,
    status: String,
    bank_account_id: Uuid,
    transfer_reference: Option<String>,
    requested_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

const PAYOUT_COLUMNS: &str = "id, organizer_id, amount_minor, status, bank_account_id, \
     transfer_reference, requested_at, settled_at, failure_reason";

impl TryFrom<PayoutRow> for Payout {
    type Error = StoreError;

    fn try_from(row: PayoutRow) -> Result<Payout> {
        Ok(Payout {
            id: PayoutId::from_uuid(row.id),
            organizer_id: UserId::from_uuid(row.organizer_id),
            amount: money_from_db(row.amount_minor)?,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            bank_account_id: BankAccountId::from_uuid(row.bank_account_id),
            transfer_reference: row.transfer_reference,
            requested_at: row.requested_at,
            settled_at: row.settled_at,
            failure_reason: row.failure_reason,
        })
    }
}

#[derive(FromRow)]
struct BankAccountRow {
    id: Uuid,
    organizer_id: Uuid,
    bank_code: String,
    account_number_masked: String,
    account_name: String,
    recipient_code: String,
    created_at: DateTime<Utc>,
}

impl From<BankAccountRow> for BankAccount {
    fn from(row: BankAccountRow) -> Self {
        Self {
            id: BankAccountId::from_uuid(row.id),
            organizer_id: UserId::from_uuid(row.organizer_id),
            bank_code: row.bank_code,
            account_number_masked: row.account_number_masked,
            account_name: row.account_name,
            recipient_code: row.recipient_code,
            created_at: row.created_at,
        }
    }
}

/// An organizer's revenue position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Balance {
    /// Lifetime organizer revenue across paid orders.
    pub lifetime_revenue: Money,
    /// Amount locked in pending/processing/completed payouts.
    pub withheld: Money,
    /// What can be requested right now.
    pub available: Money,
}

/// Repository for payouts and bank accounts.
pub struct PayoutRepo {
    pool: PgPool,
}

impl PayoutRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers or replaces the organizer's bank account.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn upsert_bank_account(&self, account: &BankAccount) -> Result<()> {
        sqlx::query(
            "INSERT INTO bank_accounts
               (id, organizer_id, bank_code, account_number_masked, account_name,
                recipient_code, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (organizer_id) DO UPDATE SET
                bank_code = EXCLUDED.bank_code,
                account_number_masked = EXCLUDED.account_number_masked,
                account_name = EXCLUDED.account_name,
                recipient_code = EXCLUDED.recipient_code",
        )
        .bind(account.id.as_uuid())
        .bind(account.organizer_id.as_uuid())
        .bind(&account.bank_code)
        .bind(&account.account_number_masked)
        .bind(&account.account_name)
        .bind(&account.recipient_code)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads the organizer's bank account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if none is registered.
    pub async fn get_bank_account(&self, organizer_id: UserId) -> Result<BankAccount> {
        let row: Option<BankAccountRow> = sqlx::query_as(
            "SELECT id, organizer_id, bank_code, account_number_masked, account_name,
                    recipient_code, created_at
             FROM bank_accounts WHERE organizer_id = $1",
        )
        .bind(organizer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.ok_or(StoreError::not_found("bank account"))?.into())
    }

    /// Computes the organizer's balance outside a transaction (dashboard
    /// display; the authoritative check happens in
    /// [`request`](Self::request)).
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn balance(&self, organizer_id: UserId) -> Result<Balance> {
        let mut conn = self.pool.acquire().await?;
        Self::balance_on(&mut conn, organizer_id).await
    }

    /// Balance query against one connection (shared by the dashboard path
    /// and the locked request path).
    async fn balance_on(
        conn: &mut sqlx::PgConnection,
        organizer_id: UserId,
    ) -> Result<Balance> {
        let (revenue,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(o.subtotal_minor - o.discount_minor), 0)::bigint
             FROM orders o
             JOIN events e ON o.event_id = e.id
             WHERE e.organizer_id = $1 AND o.status = 'paid'",
        )
        .bind(organizer_id.as_uuid())
        .fetch_one(&mut *conn)
        .await?;

        let (withheld,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_minor), 0)::bigint
             FROM payouts
             WHERE organizer_id = $1 AND status != 'failed'",
        )
        .bind(organizer_id.as_uuid())
        .fetch_one(&mut *conn)
        .await?;

        let lifetime_revenue = money_from_db(revenue)?;
        let withheld = money_from_db(withheld)?;
        let available = lifetime_revenue.checked_sub(withheld).unwrap_or(Money::ZERO);

        Ok(Balance {
            lifetime_revenue,
            withheld,
            available,
        })
    }

    /// Requests a payout: locks the organizer row, re-checks the balance,
    /// and inserts the pending payout — one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InsufficientBalance`] (wrapped) when the
    /// amount exceeds the available balance, or [`StoreError::NotFound`]
    /// when no bank account is registered.
    pub async fn request(&self, organizer_id: UserId, amount: Money) -> Result<Payout> {
        let mut tx = self.pool.begin().await?;

        // The user row is the lock anchor serializing payout requests per
        // organizer.
        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(organizer_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::not_found("user"));
        }

        let account_row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM bank_accounts WHERE organizer_id = $1")
                .bind(organizer_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some((bank_account_id,)) = account_row else {
            return Err(StoreError::not_found("bank account"));
        };

        let balance = Self::balance_on(&mut tx, organizer_id).await?;
        if amount > balance.available {
            return Err(StoreError::Domain(DomainError::InsufficientBalance {
                available: balance.available,
            }));
        }

        let payout = Payout {
            id: PayoutId::new(),
            organizer_id,
            amount,
            status: PayoutStatus::Pending,
            bank_account_id: BankAccountId::from_uuid(bank_account_id),
            transfer_reference: None,
            requested_at: Utc::now(),
            settled_at: None,
            failure_reason: None,
        };

        sqlx::query(
            "INSERT INTO payouts (id, organizer_id, amount_minor, status, bank_account_id, requested_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(payout.id.as_uuid())
        .bind(payout.organizer_id.as_uuid())
        .bind(money_to_db(payout.amount)?)
        .bind(payout.status.as_str())
        .bind(payout.bank_account_id.as_uuid())
        .bind(payout.requested_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            payout_id = %payout.id,
            organizer_id = %organizer_id,
            amount = %amount,
            "payout requested"
        );

        Ok(payout)
    }

    /// Approves a pending payout, attaching the gateway transfer
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the payout is not pending.
    pub async fn approve(&self, id: PayoutId, transfer_reference: &str) -> Result<Payout> {
        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "UPDATE payouts SET status = 'processing', transfer_reference = $2
             WHERE id = $1 AND status = 'pending'
             RETURNING {PAYOUT_COLUMNS}",
        ))
        .bind(id.as_uuid())
        .bind(transfer_reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map_or_else(
            || Err(StoreError::Conflict("payout is not pending".into())),
            PayoutRow::try_into,
        )
    }

    /// Settles a processing payout from a transfer webhook. `Ok(None)` when
    /// the reference is unknown or the payout already settled (replay).
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn settle_transfer(
        &self,
        transfer_reference: &str,
        success: bool,
        failure_reason: Option<&str>,
    ) -> Result<Option<Payout>> {
        let status = if success {
            PayoutStatus::Completed
        } else {
            PayoutStatus::Failed
        };

        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "UPDATE payouts SET status = $2, settled_at = now(), failure_reason = $3
             WHERE transfer_reference = $1 AND status = 'processing'
             RETURNING {PAYOUT_COLUMNS}",
        ))
        .bind(transfer_reference)
        .bind(status.as_str())
        .bind(failure_reason)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PayoutRow::try_into).transpose()
    }

    /// An organizer's payouts, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_organizer(&self, organizer_id: UserId) -> Result<Vec<Payout>> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE organizer_id = $1
             ORDER BY requested_at DESC",
        ))
        .bind(organizer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PayoutRow::try_into).collect()
    }

    /// Payouts in one status (admin approval queue), oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<Payout>> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE status = $1
             ORDER BY requested_at ASC",
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PayoutRow::try_into).collect()
    }

    /// Loads one payout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn get(&self, id: PayoutId) -> Result<Payout> {
        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = $1",
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("payout"))?.try_into()
    }
}
