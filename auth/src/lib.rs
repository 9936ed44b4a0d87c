//! Sessions, magic-link tokens and notification providers.
//!
//! Authentication is passwordless: a buyer requests a magic link, the
//! single-use token is verified, and an opaque session is created in Redis
//! with a TTL. Sessions carry the user's *active role*, which the web layer
//! authorizes against.
//!
//! The crate exposes provider traits ([`providers::SessionStore`],
//! [`providers::TokenStore`], [`providers::RateLimiter`],
//! [`providers::EmailProvider`]) with Redis/SMTP implementations in
//! [`stores`] and [`providers`], and in-memory mocks in [`mocks`] behind the
//! `test-utils` feature.

pub mod error;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod providers;
pub mod session;
pub mod stores;
pub mod utils;

pub use error::{AuthError, Result};
pub use session::{Session, SessionId};
