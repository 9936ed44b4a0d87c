//! Error type bridging domain, store and auth errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use boxoffice_auth::AuthError;
use boxoffice_core::DomainError;
use boxoffice_postgres::StoreError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Wraps lower-layer errors and renders a JSON `{ code, message }` body
/// with the right status. Server-side failures are logged with their
/// source and never leaked to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Creates a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attaches the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST".into())
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED".into())
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN".into())
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} not found"),
            "NOT_FOUND".into(),
        )
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".into())
    }

    /// 422 Unprocessable Entity.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".into(),
        )
    }

    /// 429 Too Many Requests.
    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            message.into(),
            "TOO_MANY_REQUESTS".into(),
        )
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".into(),
        )
    }

    /// 502 Bad Gateway (payment processor failures).
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message.into(), "BAD_GATEWAY".into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    error = %source,
                    "internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::InvalidInput(msg) => Self::validation(msg.clone()),
            DomainError::ArithmeticOverflow => {
                Self::internal("amount out of range").with_source(err.into())
            }
            _ if err.is_conflict() => Self::conflict(err.to_string()),
            _ => Self::validation(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity } => Self::not_found(entity),
            StoreError::Conflict(msg) => Self::conflict(msg),
            StoreError::Domain(domain) => domain.into(),
            StoreError::Corrupt(_) => {
                Self::internal("stored data is inconsistent").with_source(err.into())
            }
            StoreError::Database(_) => {
                Self::internal("database unavailable").with_source(err.into())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::InvalidToken => Self::unauthorized("invalid or expired sign-in token"),
            AuthError::SessionExpired => Self::unauthorized("session expired"),
            AuthError::SessionNotFound => Self::unauthorized("invalid session"),
            AuthError::TooManyAttempts { .. } => {
                Self::too_many_requests("too many attempts, slow down")
            }
            AuthError::InvalidEmail => Self::validation("invalid email address"),
            AuthError::SessionConflict(_)
            | AuthError::EmailError(_)
            | AuthError::SerializationError(_)
            | AuthError::StorageError(_) => {
                Self::internal("authentication backend failed").with_source(err.into())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("an internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::Money;

    #[test]
    fn display_includes_code() {
        let err = AppError::bad_request("invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] invalid input");
    }

    #[test]
    fn domain_conflicts_map_to_409() {
        let err: AppError = DomainError::SoldOut.into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: AppError = DomainError::InsufficientBalance {
            available: Money::ZERO,
        }
        .into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn domain_validation_maps_to_422() {
        let err: AppError = DomainError::SalesWindowClosed.into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn auth_errors_map_to_their_statuses() {
        let err: AppError = AuthError::SessionExpired.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err: AppError = AuthError::TooManyAttempts {
            retry_after: std::time::Duration::from_secs(60),
        }
        .into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn store_not_found_maps_to_404() {
        let err: AppError = boxoffice_postgres::StoreError::not_found("event").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "[NOT_FOUND] event not found");
    }
}
