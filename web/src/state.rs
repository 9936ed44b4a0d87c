//! Application state shared across all HTTP handlers.

use crate::config::Config;
use crate::gateway::PaymentGateway;
use boxoffice_auth::providers::{EmailProvider, RateLimiter, SessionStore, TokenStore};
use boxoffice_postgres::Database;
use std::sync::Arc;

/// Shared resources behind every handler. Cloned per request (all members
/// are cheap handles).
#[derive(Clone)]
pub struct AppState {
    /// The marketplace database.
    pub db: Database,
    /// Session storage (Redis in production).
    pub sessions: Arc<dyn SessionStore>,
    /// Single-use magic-link tokens.
    pub tokens: Arc<dyn TokenStore>,
    /// Sliding-window rate limiter.
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Outbound email.
    pub email: Arc<dyn EmailProvider>,
    /// Payment gateway client.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Loaded configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub fn new(
        db: Database,
        sessions: Arc<dyn SessionStore>,
        tokens: Arc<dyn TokenStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        email: Arc<dyn EmailProvider>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            sessions,
            tokens,
            rate_limiter,
            email,
            gateway,
            config,
        }
    }
}
