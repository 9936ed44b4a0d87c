//! Session state stored in Redis.

use boxoffice_core::ids::UserId;
use boxoffice_core::user::Role;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// Opaque session identifier; its string form is the bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A server-side session record.
///
/// `user_id` and `ip_address` are immutable once created — the store
/// rejects updates that change them. `active_role`, `last_active` and
/// `expires_at` are the mutable working set (role switching and the
/// sliding expiry window).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub session_id: SessionId,
    /// Authenticated user.
    pub user_id: UserId,
    /// User's email at login time.
    pub email: String,
    /// Role the user is currently acting under.
    pub active_role: Role,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last request seen on this session.
    pub last_active: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// Client IP at login time.
    pub ip_address: IpAddr,
    /// Client user agent at login time.
    pub user_agent: String,
}

impl Session {
    /// Creates a fresh buyer session expiring after `ttl`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        email: String,
        ip_address: IpAddr,
        user_agent: String,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            user_id,
            email,
            active_role: Role::Buyer,
            created_at: now,
            last_active: now,
            expires_at: now + ttl,
            ip_address,
            user_agent,
        }
    }

    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Refreshes the sliding expiry window: touches `last_active` and
    /// pushes `expires_at` out by `ttl` from now.
    pub fn touch(&mut self, ttl: Duration) {
        let now = Utc::now();
        self.last_active = now;
        self.expires_at = now + ttl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn new_session_starts_as_buyer() {
        let session = Session::new(
            UserId::new(),
            "buyer@example.com".into(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "Test".into(),
            Duration::hours(24),
        );
        assert_eq!(session.active_role, Role::Buyer);
        assert!(!session.is_expired(Utc::now()));
    }

    #[test]
    fn touch_extends_expiry() {
        let mut session = Session::new(
            UserId::new(),
            "buyer@example.com".into(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "Test".into(),
            Duration::seconds(10),
        );
        let before = session.expires_at;
        session.touch(Duration::hours(1));
        assert!(session.expires_at > before);
    }
}
