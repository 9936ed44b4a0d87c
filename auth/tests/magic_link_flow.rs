//! End-to-end magic-link flow against the in-memory providers.
//!
//! Exercises the same sequence the web layer drives: request a link
//! (rate-limited, emailed), consume the single-use token, create a
//! session, switch roles, and log out everywhere.

#![allow(clippy::unwrap_used)]

use boxoffice_auth::mocks::{
    MockEmailProvider, MockRateLimiter, MockSessionStore, MockTokenStore, SentEmail,
};
use boxoffice_auth::providers::{
    EmailProvider, RateLimiter, SessionStore, TokenData, TokenStore,
};
use boxoffice_auth::session::Session;
use boxoffice_auth::utils::{generate_token, normalize_email};
use boxoffice_auth::AuthError;
use boxoffice_core::ids::UserId;
use boxoffice_core::user::Role;
use chrono::{Duration, Utc};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration as StdDuration;

const EMAIL: &str = "Buyer@Example.com";

#[tokio::test]
async fn full_sign_in_flow() {
    let tokens = MockTokenStore::new();
    let sessions = MockSessionStore::new();
    let email_provider = MockEmailProvider::new();
    let limiter = MockRateLimiter::new();

    let email = normalize_email(EMAIL);

    // Request: rate limit, mint the token, send the link.
    limiter
        .check_and_record(&format!("magic_link:{email}"), 5, StdDuration::from_secs(900))
        .await
        .unwrap();

    let token_id = generate_token(16);
    let secret = generate_token(32);
    let expires_at = Utc::now() + Duration::minutes(15);
    tokens
        .store_token(
            &token_id,
            TokenData {
                email: email.clone(),
                secret: secret.clone(),
                expires_at,
            },
        )
        .await
        .unwrap();

    let link = format!("http://localhost:8080/auth/verify?token={token_id}.{secret}");
    email_provider
        .send_magic_link(&email, &link, expires_at)
        .await
        .unwrap();

    assert!(matches!(
        email_provider.sent().as_slice(),
        [SentEmail::MagicLink { to, .. }] if to.as_str() == "buyer@example.com"
    ));

    // Verify: consume the token exactly once.
    let data = tokens.consume_token(&token_id, &secret).await.unwrap();
    assert_eq!(data.unwrap().email, email);
    assert!(tokens.consume_token(&token_id, &secret).await.unwrap().is_none());

    // Session: create, then switch the active role.
    let user_id = UserId::new();
    let session = Session::new(
        user_id,
        email,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        "Test".into(),
        Duration::hours(24),
    );
    sessions
        .create_session(&session, Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(
        sessions.get_session(session.session_id).await.unwrap().active_role,
        Role::Buyer
    );

    let mut switched = session.clone();
    switched.active_role = Role::Organizer;
    sessions.update_session(&switched).await.unwrap();
    assert_eq!(
        sessions.get_session(session.session_id).await.unwrap().active_role,
        Role::Organizer
    );

    // Logout everywhere.
    assert_eq!(sessions.delete_user_sessions(user_id).await.unwrap(), 1);
    assert!(matches!(
        sessions.get_session(session.session_id).await,
        Err(AuthError::SessionNotFound)
    ));
}

#[tokio::test]
async fn rate_limit_stops_link_stuffing() {
    let limiter = MockRateLimiter::new();
    let key = "magic_link:victim@example.com";

    for _ in 0..5 {
        limiter
            .check_and_record(key, 5, StdDuration::from_secs(900))
            .await
            .unwrap();
    }

    assert!(matches!(
        limiter.check_and_record(key, 5, StdDuration::from_secs(900)).await,
        Err(AuthError::TooManyAttempts { .. })
    ));
}

#[tokio::test]
async fn expired_token_never_verifies() {
    let tokens = MockTokenStore::new();
    tokens
        .store_token(
            "stale",
            TokenData {
                email: "buyer@example.com".into(),
                secret: "s".into(),
                expires_at: Utc::now() - Duration::seconds(1),
            },
        )
        .await
        .unwrap();

    assert!(tokens.consume_token("stale", "s").await.unwrap().is_none());
}
