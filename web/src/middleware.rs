//! Authentication extractors.
//!
//! `SessionUser` validates the bearer session against Redis and the user
//! row (suspension check) and refreshes the sliding expiry window.
//! `RequireOrganizer` / `RequireAdmin` additionally authorize on the
//! session's *active* role, so a user holding several roles only acts
//! under the one they switched to.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use boxoffice_auth::session::{Session, SessionId};
use boxoffice_core::user::{Role, User};
use chrono::Duration;

/// Bearer token extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("invalid authorization format, expected 'Bearer <token>'")
            })?
            .to_string();

        if token.is_empty() {
            return Err(AppError::unauthorized("empty bearer token"));
        }

        Ok(Self(token))
    }
}

/// An authenticated user with a live session.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The validated session.
    pub session: Session,
    /// The user row behind the session.
    pub user: User,
}

impl SessionUser {
    /// The user's email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.user.email
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;

        let uuid = uuid::Uuid::parse_str(&bearer.0)
            .map_err(|_| AppError::unauthorized("invalid session token format"))?;
        let session_id = SessionId(uuid);

        let mut session = state.sessions.get_session(session_id).await?;

        let user = state.db.users().get(session.user_id).await.map_err(|e| {
            match e {
                boxoffice_postgres::StoreError::NotFound { .. } => {
                    AppError::unauthorized("invalid session")
                }
                other => other.into(),
            }
        })?;

        if user.suspended {
            return Err(AppError::forbidden("account suspended"));
        }

        // Sliding window: push the expiry out on activity. A failed
        // refresh only shortens the session, so it is logged, not fatal.
        let ttl = Duration::seconds(i64::try_from(state.config.auth.session_ttl).unwrap_or(0));
        session.touch(ttl);
        if let Err(e) = state.sessions.update_session(&session).await {
            tracing::warn!(session_id = %session.session_id, error = %e, "session refresh failed");
        }

        Ok(Self { session, user })
    }
}

/// An authenticated user acting as a buyer (the storefront default).
#[derive(Debug, Clone)]
pub struct RequireBuyer(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireBuyer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_user = SessionUser::from_request_parts(parts, state).await?;
        if session_user.session.active_role != Role::Buyer {
            return Err(AppError::forbidden(
                "buyer role required (switch your active role)",
            ));
        }
        Ok(Self(session_user))
    }
}

/// An authenticated user acting as an organizer.
#[derive(Debug, Clone)]
pub struct RequireOrganizer(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireOrganizer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_user = SessionUser::from_request_parts(parts, state).await?;
        if session_user.session.active_role != Role::Organizer {
            return Err(AppError::forbidden(
                "organizer role required (switch your active role)",
            ));
        }
        Ok(Self(session_user))
    }
}

/// An authenticated user acting as an admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_user = SessionUser::from_request_parts(parts, state).await?;
        if session_user.session.active_role != Role::Admin {
            return Err(AppError::forbidden("admin role required"));
        }
        Ok(Self(session_user))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn bearer_token_is_extracted() {
        let req = Request::builder()
            .header("authorization", "Bearer abc123")
            .body(())
            .expect("valid request");
        let (mut parts, ()) = req.into_parts();

        let token = BearerToken::from_request_parts(&mut parts, &())
            .await
            .expect("token extracts");
        assert_eq!(token.0, "abc123");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let req = Request::builder().body(()).expect("valid request");
        let (mut parts, ()) = req.into_parts();
        assert!(BearerToken::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let req = Request::builder()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .expect("valid request");
        let (mut parts, ()) = req.into_parts();
        assert!(BearerToken::from_request_parts(&mut parts, &()).await.is_err());
    }
}
