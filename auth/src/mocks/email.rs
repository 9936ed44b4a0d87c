//! In-memory email provider mock that records every message.

use crate::error::Result;
use crate::providers::{EmailProvider, OrderConfirmation, PayoutUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// A message captured by [`MockEmailProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentEmail {
    /// A magic-link message.
    MagicLink {
        /// Recipient.
        to: String,
        /// The sign-in link.
        link: String,
    },
    /// An order confirmation.
    OrderConfirmation {
        /// Recipient.
        to: String,
        /// Codes of the issued tickets.
        ticket_codes: Vec<String>,
    },
    /// A payout status notification.
    PayoutUpdate {
        /// Recipient.
        to: String,
    },
}

/// In-memory [`EmailProvider`] that records instead of sending.
#[derive(Default)]
pub struct MockEmailProvider {
    sent: Mutex<Vec<SentEmail>>,
}

impl MockEmailProvider {
    /// Creates an empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every captured message.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)] // mock: lock poisoning is a test bug
impl EmailProvider for MockEmailProvider {
    async fn send_magic_link(
        &self,
        to: &str,
        link: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(SentEmail::MagicLink {
            to: to.into(),
            link: link.into(),
        });
        Ok(())
    }

    async fn send_order_confirmation(
        &self,
        to: &str,
        confirmation: &OrderConfirmation,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(SentEmail::OrderConfirmation {
                to: to.into(),
                ticket_codes: confirmation.ticket_codes.clone(),
            });
        Ok(())
    }

    async fn send_payout_update(&self, to: &str, _update: &PayoutUpdate) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(SentEmail::PayoutUpdate { to: to.into() });
        Ok(())
    }
}
