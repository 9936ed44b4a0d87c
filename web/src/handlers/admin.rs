//! Admin console endpoints: user moderation, event force-cancel, the
//! payout approval queue and platform stats.

use crate::error::AppError;
use crate::handlers::auth::UserResponse;
use crate::handlers::payouts::PayoutView;
use crate::middleware::RequireAdmin;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use boxoffice_core::event::EventStatus;
use boxoffice_core::ids::{EventId, PayoutId, UserId};
use boxoffice_core::money::Money;
use boxoffice_core::payout::PayoutStatus;
use boxoffice_core::user::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Query parameters for the user listing.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Page number (0-indexed).
    #[serde(default)]
    pub page: usize,
    /// Page size (default 20, capped at 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Email substring filter.
    pub email: Option<String>,
    /// Role filter.
    pub role: Option<Role>,
}

const fn default_page_size() -> usize {
    20
}

/// Paginated user listing.
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    /// Users on this page.
    pub users: Vec<AdminUserView>,
    /// Total matching users.
    pub total: u64,
    /// Current page.
    pub page: usize,
    /// Page size used.
    pub page_size: usize,
}

/// A user as the admin console sees it.
#[derive(Debug, Serialize)]
pub struct AdminUserView {
    /// The user.
    #[serde(flatten)]
    pub user: UserResponse,
    /// Whether the account is suspended.
    pub suspended: bool,
}

/// `GET /api/admin/users` — paginated user listing.
///
/// # Errors
///
/// Returns 403 unless acting as an admin.
pub async fn list_users(
    _admin: RequireAdmin,
    Query(query): Query<ListUsersQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let page_size = query.page_size.clamp(1, 100);
    let limit = page_size as i64;
    let offset = (query.page as i64).saturating_mul(limit);

    let (users, total) = state
        .db
        .users()
        .list(query.email.as_deref(), query.role, limit, offset)
        .await?;

    Ok(Json(ListUsersResponse {
        users: users
            .into_iter()
            .map(|u| AdminUserView {
                suspended: u.suspended,
                user: u.into(),
            })
            .collect(),
        total,
        page: query.page,
        page_size,
    }))
}

/// `POST /api/admin/users/:id/suspend` — suspend an account.
///
/// Live sessions are deleted; the next request fails validation.
///
/// # Errors
///
/// Returns 404 for unknown users, 409 when suspending yourself.
pub async fn suspend_user(
    admin: RequireAdmin,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AdminUserView>, AppError> {
    let user_id = UserId::from_uuid(user_id);
    if user_id == admin.0.user.id {
        return Err(AppError::conflict("you cannot suspend yourself"));
    }

    state.db.users().set_suspended(user_id, true).await?;
    let deleted = state.sessions.delete_user_sessions(user_id).await?;

    tracing::info!(
        target_user = %user_id,
        admin = %admin.0.user.id,
        sessions_deleted = deleted,
        "user suspended"
    );

    let user = state.db.users().get(user_id).await?;
    Ok(Json(AdminUserView {
        suspended: user.suspended,
        user: user.into(),
    }))
}

/// `POST /api/admin/users/:id/unsuspend` — reinstate an account.
///
/// # Errors
///
/// Returns 404 for unknown users.
pub async fn unsuspend_user(
    admin: RequireAdmin,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AdminUserView>, AppError> {
    let user_id = UserId::from_uuid(user_id);
    state.db.users().set_suspended(user_id, false).await?;

    tracing::info!(target_user = %user_id, admin = %admin.0.user.id, "user reinstated");

    let user = state.db.users().get(user_id).await?;
    Ok(Json(AdminUserView {
        suspended: user.suspended,
        user: user.into(),
    }))
}

/// Request to force-cancel an event.
#[derive(Debug, Deserialize)]
pub struct CancelEventRequest {
    /// Reason recorded in the audit log.
    pub reason: String,
}

/// Result of a forced cancellation.
#[derive(Debug, Serialize)]
pub struct CancelEventResponse {
    /// The cancelled event.
    pub event_id: Uuid,
    /// Tickets voided.
    pub tickets_voided: u64,
    /// Pending orders cancelled.
    pub orders_cancelled: u64,
}

/// `POST /api/admin/events/:id/cancel` — force-cancel from any
/// non-terminal status.
///
/// Admins bypass the organizer transition table but still cannot cancel
/// a completed or already-cancelled event.
///
/// # Errors
///
/// Returns 409 for terminal events.
pub async fn cancel_event(
    admin: RequireAdmin,
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<CancelEventRequest>,
) -> Result<Json<CancelEventResponse>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    let event = state.db.events().get(event_id).await?;

    if event.status.is_terminal() {
        return Err(AppError::conflict(format!("event is already {}", event.status)));
    }

    state
        .db
        .events()
        .set_status(event_id, event.status, EventStatus::Cancelled)
        .await?;
    let tickets_voided = state.db.tickets().void_for_event(event_id).await?;
    let orders_cancelled = state.db.orders().cancel_pending_for_event(event_id).await?;

    tracing::warn!(
        event_id = %event_id,
        admin = %admin.0.user.id,
        reason = %request.reason,
        tickets_voided,
        orders_cancelled,
        "event force-cancelled"
    );

    Ok(Json(CancelEventResponse {
        event_id: *event_id.as_uuid(),
        tickets_voided,
        orders_cancelled,
    }))
}

/// Platform totals.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Registered users.
    pub users: u64,
    /// Events per status.
    pub events_by_status: HashMap<String, u64>,
    /// Orders per status.
    pub orders_by_status: HashMap<String, u64>,
    /// Gross buyer volume across paid orders.
    pub gross_volume: Money,
    /// Platform fee revenue across paid orders.
    pub platform_fee_revenue: Money,
}

/// `GET /api/admin/stats` — platform totals.
///
/// # Errors
///
/// Returns 403 unless acting as an admin.
pub async fn stats(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.db.stats().platform().await?;
    Ok(Json(StatsResponse {
        users: stats.users,
        events_by_status: stats.events_by_status,
        orders_by_status: stats.orders_by_status,
        gross_volume: stats.gross_volume,
        platform_fee_revenue: stats.platform_fee_revenue,
    }))
}

/// Query parameters for the payout queue.
#[derive(Debug, Deserialize)]
pub struct PayoutQueueQuery {
    /// Status to list (default: pending).
    pub status: Option<PayoutStatus>,
}

/// `GET /api/admin/payouts` — the payout queue.
///
/// # Errors
///
/// Returns 403 unless acting as an admin.
pub async fn list_payouts(
    _admin: RequireAdmin,
    Query(query): Query<PayoutQueueQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PayoutView>>, AppError> {
    let status = query.status.unwrap_or(PayoutStatus::Pending);
    let payouts = state.db.payouts().list_by_status(status).await?;
    Ok(Json(payouts.into_iter().map(PayoutView::from).collect()))
}

/// `POST /api/admin/payouts/:id/approve` — approve a pending payout and
/// initiate the bank transfer.
///
/// The transfer webhooks settle the payout from Processing.
///
/// # Errors
///
/// Returns 409 for non-pending payouts, 502 when the gateway refuses the
/// transfer.
pub async fn approve_payout(
    admin: RequireAdmin,
    Path(payout_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PayoutView>, AppError> {
    let payout_id = PayoutId::from_uuid(payout_id);

    // Win the pending → processing guard first; only then touch the
    // gateway. Two concurrent approvals cannot both initiate a transfer.
    let transfer_reference = format!("bo_trf_{}", Uuid::new_v4().simple());
    let payout = state
        .db
        .payouts()
        .approve(payout_id, &transfer_reference)
        .await?;

    let account = state
        .db
        .payouts()
        .get_bank_account(payout.organizer_id)
        .await?;

    if let Err(e) = state
        .gateway
        .initiate_transfer(
            &transfer_reference,
            &account.recipient_code,
            payout.amount,
            "boxoffice payout",
        )
        .await
    {
        // The transfer never left; fail the payout so the balance is
        // restored and the organizer can request again.
        if let Err(settle_err) = state
            .db
            .payouts()
            .settle_transfer(&transfer_reference, false, Some("transfer initiation failed"))
            .await
        {
            tracing::error!(payout_id = %payout.id, error = %settle_err, "payout rollback failed");
        }
        return Err(AppError::bad_gateway("transfer initiation failed").with_source(e.into()));
    }

    tracing::info!(
        payout_id = %payout.id,
        admin = %admin.0.user.id,
        reference = %transfer_reference,
        "payout approved"
    );

    Ok(Json(payout.into()))
}
