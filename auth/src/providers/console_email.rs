//! Console email provider for development.
//!
//! Logs every message through `tracing` instead of delivering it, so the
//! magic-link flow works locally without an SMTP server.

use crate::error::Result;
use crate::providers::{EmailProvider, OrderConfirmation, PayoutUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Email provider that prints messages to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleEmailProvider;

impl ConsoleEmailProvider {
    /// Creates a new console email provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailProvider for ConsoleEmailProvider {
    async fn send_magic_link(
        &self,
        to: &str,
        link: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        tracing::info!(
            to = %to,
            link = %link,
            expires_at = %expires_at,
            "magic link email (console provider)"
        );
        Ok(())
    }

    async fn send_order_confirmation(
        &self,
        to: &str,
        confirmation: &OrderConfirmation,
    ) -> Result<()> {
        tracing::info!(
            to = %to,
            event = %confirmation.event_title,
            quantity = confirmation.quantity,
            total = %confirmation.total,
            codes = ?confirmation.ticket_codes,
            "order confirmation email (console provider)"
        );
        Ok(())
    }

    async fn send_payout_update(&self, to: &str, update: &PayoutUpdate) -> Result<()> {
        tracing::info!(
            to = %to,
            amount = %update.amount,
            status = %update.status,
            reason = ?update.failure_reason,
            "payout update email (console provider)"
        );
        Ok(())
    }
}
