//! HTTP handlers, one module per surface.

pub mod admin;
pub mod auth;
pub mod health;
pub mod organizer;
pub mod orders;
pub mod payouts;
pub mod reservations;
pub mod storefront;
pub mod tickets;
pub mod webhooks;
