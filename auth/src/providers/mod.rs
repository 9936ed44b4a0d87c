//! Provider traits for sessions, tokens, rate limiting and email.
//!
//! The web layer depends only on these traits; Redis and SMTP
//! implementations live in [`crate::stores`] and this module, mocks in
//! [`crate::mocks`]. All traits are object-safe so `AppState` can hold
//! `Arc<dyn …>` handles.

mod console_email;
mod smtp_email;

pub use console_email::ConsoleEmailProvider;
pub use smtp_email::SmtpEmailProvider;

use crate::error::Result;
use crate::session::{Session, SessionId};
use async_trait::async_trait;
use boxoffice_core::ids::UserId;
use boxoffice_core::money::Money;
use boxoffice_core::payout::PayoutStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side session storage with TTL-based expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new session with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::SessionConflict`] if the session id
    /// already exists (fixation guard), or a storage error.
    async fn create_session(&self, session: &Session, ttl: chrono::Duration) -> Result<()>;

    /// Loads a session, rejecting expired ones even if the store still
    /// holds them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::SessionNotFound`] or
    /// [`crate::AuthError::SessionExpired`].
    async fn get_session(&self, session_id: SessionId) -> Result<Session>;

    /// Rewrites a session's mutable fields and refreshes its TTL from
    /// `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::SessionConflict`] if an immutable field
    /// changed.
    async fn update_session(&self, session: &Session) -> Result<()>;

    /// Deletes one session. Deleting a missing session is not an error.
    ///
    /// # Errors
    ///
    /// Returns a storage error if Redis fails.
    async fn delete_session(&self, session_id: SessionId) -> Result<()>;

    /// Atomically deletes every session of a user, returning the count.
    ///
    /// # Errors
    ///
    /// Returns a storage error if Redis fails.
    async fn delete_user_sessions(&self, user_id: UserId) -> Result<usize>;
}

/// Payload of a single-use magic-link token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// Email the link was sent to.
    pub email: String,
    /// Random secret embedded in the link, compared in constant time.
    pub secret: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Single-use token storage.
///
/// Consumption is atomic (one concurrent consumer wins); tokens expire on
/// their own via TTL.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a token under `token_id` until `data.expires_at`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    async fn store_token(&self, token_id: &str, data: TokenData) -> Result<()>;

    /// Atomically consumes a token: removes it and returns its payload if
    /// `secret` matches and the token has not expired. Returns `Ok(None)`
    /// for unknown, expired, already-used, or mismatched tokens — callers
    /// cannot distinguish these, on purpose.
    ///
    /// # Errors
    ///
    /// Returns a storage error if Redis fails.
    async fn consume_token(&self, token_id: &str, secret: &str) -> Result<Option<TokenData>>;
}

/// Sliding-window rate limiting.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records an attempt under `key` and enforces the limit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::TooManyAttempts`] if `max_attempts`
    /// would be exceeded inside `window`.
    async fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: std::time::Duration,
    ) -> Result<()>;
}

/// Summary of a paid order, for the confirmation email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderConfirmation {
    /// Event title.
    pub event_title: String,
    /// Ticket type name.
    pub ticket_type: String,
    /// Number of tickets.
    pub quantity: u32,
    /// Total charged.
    pub total: Money,
    /// Admission codes of the issued tickets.
    pub ticket_codes: Vec<String>,
}

/// Summary of a payout status change, for the notification email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutUpdate {
    /// Payout amount.
    pub amount: Money,
    /// New payout status.
    pub status: PayoutStatus,
    /// Failure reason when the transfer failed.
    pub failure_reason: Option<String>,
}

/// Outbound email delivery.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Sends a sign-in link.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::EmailError`] on delivery failure.
    async fn send_magic_link(
        &self,
        to: &str,
        link: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Sends an order confirmation with ticket codes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::EmailError`] on delivery failure.
    async fn send_order_confirmation(
        &self,
        to: &str,
        confirmation: &OrderConfirmation,
    ) -> Result<()>;

    /// Notifies an organizer that a payout changed status.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::EmailError`] on delivery failure.
    async fn send_payout_update(&self, to: &str, update: &PayoutUpdate) -> Result<()>;
}
