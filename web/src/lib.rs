//! HTTP API server for the boxoffice ticketing marketplace.
//!
//! Three surfaces behind one axum router:
//! - the public **storefront** (browse events, webhooks, magic-link auth);
//! - the authenticated **buyer** surface (reservations, checkout, orders,
//!   tickets);
//! - the **organizer** dashboard and **admin** console, authorized by the
//!   session's active role.

pub mod config;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod sweeper;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;
