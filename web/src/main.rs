//! Boxoffice server binary.
//!
//! Wires configuration, Postgres, Redis stores, the email provider and
//! the payment gateway into the router, spawns the reservation sweeper,
//! and serves until ctrl-c.

use boxoffice_auth::providers::{ConsoleEmailProvider, EmailProvider, SmtpEmailProvider};
use boxoffice_auth::stores::{RedisRateLimiter, RedisSessionStore, RedisTokenStore};
use boxoffice_postgres::Database;
use boxoffice_web::gateway::{MockGateway, PaymentGateway, PaystackGateway};
use boxoffice_web::{router, sweeper, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxoffice_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "starting boxoffice server"
    );

    let db = Database::connect(&config.postgres.settings()).await?;
    db.migrate().await?;

    let sessions = Arc::new(RedisSessionStore::new(&config.redis.url).await?);
    let tokens = Arc::new(RedisTokenStore::new(&config.redis.url).await?);
    let rate_limiter = Arc::new(RedisRateLimiter::new(&config.redis.url).await?);

    let email: Arc<dyn EmailProvider> = if config.email.provider == "smtp" {
        Arc::new(SmtpEmailProvider::new(
            config.email.smtp_server.clone(),
            config.email.smtp_port,
            config.email.smtp_username.clone(),
            config.email.smtp_password.clone(),
            config.email.from_email.clone(),
            config.email.from_name.clone(),
        ))
    } else {
        Arc::new(ConsoleEmailProvider::new())
    };

    let gateway: Arc<dyn PaymentGateway> = if config.gateway.use_mock {
        tracing::warn!("using the mock payment gateway; charges auto-succeed");
        Arc::new(MockGateway::new())
    } else {
        Arc::new(PaystackGateway::new(
            config.gateway.base_url.clone(),
            config.gateway.secret_key.clone(),
        ))
    };

    let sweep_interval = Duration::from_secs(config.checkout.sweep_interval);
    let config = Arc::new(config);
    let state = AppState::new(
        db.clone(),
        sessions,
        tokens,
        rate_limiter,
        email,
        gateway,
        Arc::clone(&config),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = tokio::spawn(sweeper::run(db, sweep_interval, shutdown_rx));

    let app = router::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;
    tracing::info!("shut down cleanly");

    Ok(())
}
