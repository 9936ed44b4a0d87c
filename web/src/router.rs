//! Router configuration: the full route table.

use crate::handlers::{
    admin, auth, health, organizer, orders, payouts, reservations, storefront, tickets, webhooks,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the complete axum router.
///
/// - Health checks at the root, everything else under `/api`.
/// - Public: storefront browsing, magic-link auth, gateway webhooks.
/// - Authenticated surfaces authorize in their extractors
///   (`SessionUser` / `RequireBuyer` / `RequireOrganizer` /
///   `RequireAdmin`), not here.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/magic-link/request", post(auth::request_magic_link))
        .route("/auth/magic-link/verify", post(auth::verify_magic_link))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/role", post(auth::switch_role))
        .route("/auth/organizer", post(auth::become_organizer));

    let storefront_routes = Router::new()
        .route("/events", get(storefront::list_events))
        .route("/events/:id", get(storefront::get_event))
        .route("/events/:id/check-in", post(tickets::check_in));

    let buyer_routes = Router::new()
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations", get(reservations::list_reservations))
        .route("/reservations/:id", delete(reservations::cancel_reservation))
        .route("/orders", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/verify", post(orders::verify_order))
        .route("/tickets", get(tickets::list_tickets));

    let organizer_routes = Router::new()
        .route("/organizer/events", post(organizer::create_event))
        .route("/organizer/events", get(organizer::list_events))
        .route("/organizer/events/:id", get(organizer::get_event))
        .route("/organizer/events/:id", put(organizer::update_event))
        .route("/organizer/events/:id", delete(organizer::delete_event))
        .route("/organizer/events/:id/status", post(organizer::transition_event))
        .route(
            "/organizer/events/:id/ticket-types",
            post(organizer::create_ticket_type),
        )
        .route(
            "/organizer/ticket-types/:id",
            put(organizer::update_ticket_type),
        )
        .route(
            "/organizer/events/:id/promo-codes",
            post(organizer::create_promo),
        )
        .route(
            "/organizer/events/:id/promo-codes",
            get(organizer::list_promos),
        )
        .route(
            "/organizer/promo-codes/:id",
            delete(organizer::deactivate_promo),
        )
        .route("/payouts/balance", get(payouts::balance))
        .route("/payouts/bank-account", put(payouts::upsert_bank_account))
        .route("/payouts", post(payouts::request_payout))
        .route("/payouts", get(payouts::list_payouts));

    let admin_routes = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/suspend", post(admin::suspend_user))
        .route("/admin/users/:id/unsuspend", post(admin::unsuspend_user))
        .route("/admin/events/:id/cancel", post(admin::cancel_event))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/payouts", get(admin::list_payouts))
        .route("/admin/payouts/:id/approve", post(admin::approve_payout));

    let webhook_routes =
        Router::new().route("/webhooks/paystack", post(webhooks::paystack_webhook));

    let api = Router::new()
        .merge(auth_routes)
        .merge(storefront_routes)
        .merge(buyer_routes)
        .merge(organizer_routes)
        .merge(admin_routes)
        .merge(webhook_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
