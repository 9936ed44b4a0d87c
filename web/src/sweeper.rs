//! Background task releasing expired inventory holds.
//!
//! Reservations carry an `expires_at`; the sweep returns lapsed holds to
//! their ticket types so abandoned checkouts never strand inventory.

use boxoffice_postgres::Database;
use std::time::Duration;
use tokio::sync::watch;

/// Runs the expiry sweep every `interval` until `shutdown` flips.
pub async fn run(db: Database, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(interval_secs = interval.as_secs(), "reservation sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match db.reservations().sweep_expired(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => {
                        metrics::counter!("boxoffice_reservations_expired_total")
                            .increment(count);
                    }
                    Err(e) => {
                        // Nothing is lost: the holds stay until the next
                        // tick succeeds.
                        tracing::error!(error = %e, "reservation sweep failed");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("reservation sweeper stopping");
                    break;
                }
            }
        }
    }
}
