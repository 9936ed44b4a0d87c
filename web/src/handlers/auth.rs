//! Authentication endpoints: magic-link sign-in, session management and
//! role switching.

use crate::error::AppError;
use crate::extractors::{ClientIp, CorrelationId, UserAgent};
use crate::middleware::SessionUser;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use boxoffice_auth::providers::TokenData;
use boxoffice_auth::session::Session;
use boxoffice_auth::utils::{generate_token, is_valid_email, normalize_email};
use boxoffice_core::user::{Role, User};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use uuid::Uuid;

/// Request to send a magic link.
#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    /// Email to send the sign-in link to.
    pub email: String,
}

/// Response after requesting a magic link.
///
/// Deliberately identical for known and unknown addresses.
#[derive(Debug, Serialize)]
pub struct MagicLinkResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The raw token — populated only when
    /// `expose_magic_links_for_testing` is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Request to verify a magic link.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// The `{id}.{secret}` token from the emailed link.
    pub token: String,
}

/// Public view of a user account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id.
    pub id: Uuid,
    /// Email.
    pub email: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Roles held.
    pub roles: Vec<Role>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email,
            display_name: user.display_name,
            roles: user.roles,
            created_at: user.created_at,
        }
    }
}

/// Response after a successful verification.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Opaque bearer token (the session id).
    pub token: String,
    /// Role the session is acting under.
    pub active_role: Role,
    /// Session expiry.
    pub expires_at: DateTime<Utc>,
    /// The signed-in user.
    pub user: UserResponse,
}

/// Request to switch the session's active role.
#[derive(Debug, Deserialize)]
pub struct SwitchRoleRequest {
    /// Role to act under.
    pub role: Role,
}

/// Response after a role switch.
#[derive(Debug, Serialize)]
pub struct SwitchRoleResponse {
    /// The now-active role.
    pub active_role: Role,
}

/// `POST /api/auth/magic-link/request` — email a single-use sign-in link.
///
/// Rate-limited per address. The response never reveals whether an
/// account exists.
///
/// # Errors
///
/// Returns 422 for a malformed address, 429 when rate-limited.
pub async fn request_magic_link(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<MagicLinkRequest>,
) -> Result<Json<MagicLinkResponse>, AppError> {
    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email address"));
    }

    state
        .rate_limiter
        .check_and_record(
            &format!("magic_link:{email}"),
            state.config.auth.rate_limit_requests,
            StdDuration::from_secs(state.config.auth.rate_limit_window),
        )
        .await?;

    let token_id = generate_token(16);
    let secret = generate_token(32);
    let expires_at =
        Utc::now() + Duration::seconds(i64::try_from(state.config.auth.magic_link_ttl).unwrap_or(900));

    state
        .tokens
        .store_token(
            &token_id,
            TokenData {
                email: email.clone(),
                secret: secret.clone(),
                expires_at,
            },
        )
        .await?;

    let token = format!("{token_id}.{secret}");
    let link = format!(
        "{}/auth/verify?token={token}",
        state.config.auth.base_url
    );

    state.email.send_magic_link(&email, &link, expires_at).await?;

    tracing::info!(
        email = %email,
        correlation_id = %correlation_id.0,
        "magic link requested"
    );

    Ok(Json(MagicLinkResponse {
        message: "If the address is valid, a sign-in link is on its way".into(),
        token: state
            .config
            .auth
            .expose_magic_links_for_testing
            .then_some(token),
    }))
}

/// `POST /api/auth/magic-link/verify` — consume the link and start a
/// session.
///
/// First-time addresses get a buyer account.
///
/// # Errors
///
/// Returns 401 for an invalid, expired or already-used token.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let (token_id, secret) = request
        .token
        .split_once('.')
        .ok_or_else(|| AppError::unauthorized("invalid or expired sign-in token"))?;

    let data = state
        .tokens
        .consume_token(token_id, secret)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid or expired sign-in token"))?;

    let user = state.db.users().upsert_by_email(&data.email).await?;
    if user.suspended {
        return Err(AppError::forbidden("account suspended"));
    }

    let ttl = Duration::seconds(i64::try_from(state.config.auth.session_ttl).unwrap_or(0));
    let session = Session::new(
        user.id,
        user.email.clone(),
        client_ip.0,
        user_agent.0,
        ttl,
    );
    state.sessions.create_session(&session, ttl).await?;

    tracing::info!(user_id = %user.id, "user signed in");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token: session.session_id.to_string(),
            active_role: session.active_role,
            expires_at: session.expires_at,
            user: user.into(),
        }),
    ))
}

/// `GET /api/auth/me` — the signed-in user and session context.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn me(session_user: SessionUser) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(SessionResponse {
        token: session_user.session.session_id.to_string(),
        active_role: session_user.session.active_role,
        expires_at: session_user.session.expires_at,
        user: session_user.user.into(),
    }))
}

/// `POST /api/auth/logout` — delete this session.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn logout(
    session_user: SessionUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .delete_session(session_user.session.session_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response after logging out everywhere.
#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    /// Number of sessions removed.
    pub sessions_deleted: usize,
}

/// `POST /api/auth/logout-all` — delete every session of this user.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn logout_all(
    session_user: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<LogoutAllResponse>, AppError> {
    let sessions_deleted = state
        .sessions
        .delete_user_sessions(session_user.user.id)
        .await?;
    Ok(Json(LogoutAllResponse { sessions_deleted }))
}

/// `POST /api/auth/role` — switch the session's active role.
///
/// Only roles the user actually holds are switchable.
///
/// # Errors
///
/// Returns 403 when the user does not hold the requested role.
pub async fn switch_role(
    session_user: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<SwitchRoleRequest>,
) -> Result<Json<SwitchRoleResponse>, AppError> {
    if !session_user.user.has_role(request.role) {
        return Err(AppError::forbidden(format!(
            "you do not hold the {} role",
            request.role
        )));
    }

    let mut session = session_user.session;
    session.active_role = request.role;
    state.sessions.update_session(&session).await?;

    tracing::info!(user_id = %session.user_id, role = %request.role, "active role switched");

    Ok(Json(SwitchRoleResponse {
        active_role: request.role,
    }))
}

/// `POST /api/auth/organizer` — self-service organizer enrollment.
///
/// Idempotent; switch the active role afterwards to act as an organizer.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn become_organizer(
    session_user: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    state
        .db
        .users()
        .add_role(session_user.user.id, Role::Organizer)
        .await?;

    let user = state.db.users().get(session_user.user.id).await?;
    Ok(Json(user.into()))
}
