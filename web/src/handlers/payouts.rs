//! Payout endpoints for organizers: balance, bank account, requests.

use crate::error::AppError;
use crate::middleware::RequireOrganizer;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use boxoffice_core::ids::BankAccountId;
use boxoffice_core::money::Money;
use boxoffice_core::payout::{mask_account_number, BankAccount, Payout, PayoutStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The organizer's revenue position.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Lifetime revenue across paid orders.
    pub lifetime_revenue: Money,
    /// Locked in payouts that are pending, processing or completed.
    pub withheld: Money,
    /// Requestable right now.
    pub available: Money,
}

/// `GET /api/payouts/balance` — the organizer's balance.
///
/// # Errors
///
/// Returns 403 unless acting as an organizer.
pub async fn balance(
    organizer: RequireOrganizer,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.db.payouts().balance(organizer.0.user.id).await?;
    Ok(Json(BalanceResponse {
        lifetime_revenue: balance.lifetime_revenue,
        withheld: balance.withheld,
        available: balance.available,
    }))
}

/// Request to register a bank account.
#[derive(Debug, Deserialize)]
pub struct BankAccountRequest {
    /// Bank clearing code.
    pub bank_code: String,
    /// Full account number (only a masked form is stored).
    pub account_number: String,
    /// Account holder name.
    pub account_name: String,
    /// Gateway recipient code for transfers.
    pub recipient_code: String,
}

/// A bank account as shown back to the organizer.
#[derive(Debug, Serialize)]
pub struct BankAccountResponse {
    /// Bank clearing code.
    pub bank_code: String,
    /// Masked account number.
    pub account_number_masked: String,
    /// Account holder name.
    pub account_name: String,
}

/// `PUT /api/payouts/bank-account` — register the payout destination.
///
/// # Errors
///
/// Returns 422 for an implausible account number.
pub async fn upsert_bank_account(
    organizer: RequireOrganizer,
    State(state): State<AppState>,
    Json(request): Json<BankAccountRequest>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let digits = request.account_number.trim();
    if digits.len() < 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("account number must be at least 6 digits"));
    }

    let account = BankAccount {
        id: BankAccountId::new(),
        organizer_id: organizer.0.user.id,
        bank_code: request.bank_code,
        account_number_masked: mask_account_number(digits),
        account_name: request.account_name,
        recipient_code: request.recipient_code,
        created_at: Utc::now(),
    };
    state.db.payouts().upsert_bank_account(&account).await?;

    Ok(Json(BankAccountResponse {
        bank_code: account.bank_code,
        account_number_masked: account.account_number_masked,
        account_name: account.account_name,
    }))
}

/// Request to withdraw revenue.
#[derive(Debug, Deserialize)]
pub struct PayoutRequest {
    /// Amount in minor units.
    pub amount: u64,
}

/// A payout as shown to the organizer and the admin queue.
#[derive(Debug, Serialize)]
pub struct PayoutView {
    /// Payout id.
    pub id: Uuid,
    /// Amount.
    pub amount: Money,
    /// Current status.
    pub status: PayoutStatus,
    /// Request time.
    pub requested_at: DateTime<Utc>,
    /// Settlement time.
    pub settled_at: Option<DateTime<Utc>>,
    /// Failure reason, if failed.
    pub failure_reason: Option<String>,
}

impl From<Payout> for PayoutView {
    fn from(payout: Payout) -> Self {
        Self {
            id: *payout.id.as_uuid(),
            amount: payout.amount,
            status: payout.status,
            requested_at: payout.requested_at,
            settled_at: payout.settled_at,
            failure_reason: payout.failure_reason,
        }
    }
}

/// `POST /api/payouts` — request a payout of available revenue.
///
/// The balance check is transactional against concurrent requests.
///
/// # Errors
///
/// Returns 409 for insufficient balance, 422 below the minimum, 404
/// without a registered bank account.
pub async fn request_payout(
    organizer: RequireOrganizer,
    State(state): State<AppState>,
    Json(request): Json<PayoutRequest>,
) -> Result<(StatusCode, Json<PayoutView>), AppError> {
    if request.amount < state.config.checkout.min_payout {
        return Err(AppError::validation(format!(
            "minimum payout is {}",
            Money::from_minor(state.config.checkout.min_payout)
        )));
    }

    let payout = state
        .db
        .payouts()
        .request(organizer.0.user.id, Money::from_minor(request.amount))
        .await?;

    Ok((StatusCode::CREATED, Json(payout.into())))
}

/// `GET /api/payouts` — the organizer's payout history.
///
/// # Errors
///
/// Returns 403 unless acting as an organizer.
pub async fn list_payouts(
    organizer: RequireOrganizer,
    State(state): State<AppState>,
) -> Result<Json<Vec<PayoutView>>, AppError> {
    let payouts = state
        .db
        .payouts()
        .list_by_organizer(organizer.0.user.id)
        .await?;
    Ok(Json(payouts.into_iter().map(PayoutView::from).collect()))
}
