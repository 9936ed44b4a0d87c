//! Domain model for the boxoffice ticketing marketplace.
//!
//! Pure types and invariants: identifiers, money arithmetic, the event
//! status machine, reservations, order pricing, promo codes, tickets and
//! payouts. Persistence lives in `boxoffice-postgres`, sessions in
//! `boxoffice-auth`, and the HTTP surface in `boxoffice-web`; nothing in
//! this crate performs I/O.

pub mod error;
pub mod event;
pub mod ids;
pub mod money;
pub mod order;
pub mod payout;
pub mod promo;
pub mod reservation;
pub mod ticket;
pub mod user;

pub use error::DomainError;
pub use money::Money;
