//! Health and readiness endpoints.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use boxoffice_auth::session::SessionId;
use boxoffice_auth::AuthError;
use serde::Serialize;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// `GET /health` — liveness. Does not verify dependencies.
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness.
    pub ready: bool,
    /// Database connectivity.
    pub database: bool,
    /// Redis connectivity.
    pub redis: bool,
}

/// `GET /ready` — readiness: pings Postgres and Redis.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = state.db.ping().await.is_ok();

    // A lookup of a fresh random session id reaches Redis; only a
    // storage error means the backend is down.
    let redis = !matches!(
        state.sessions.get_session(SessionId::new()).await,
        Err(AuthError::StorageError(_))
    );

    let ready = database && redis;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            database,
            redis,
        }),
    )
}
