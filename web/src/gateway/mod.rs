//! Payment gateway abstraction.
//!
//! Models a Paystack-style processor: initialize a checkout transaction,
//! verify a charge by reference, initiate a bank transfer for payouts.
//! [`PaystackGateway`] talks to the real API; [`MockGateway`] succeeds
//! locally for development and tests.

mod mock;
mod paystack;

pub use mock::MockGateway;
pub use paystack::PaystackGateway;

use async_trait::async_trait;
use boxoffice_core::money::Money;
use thiserror::Error;

/// Gateway failure modes.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP call to the gateway failed.
    #[error("gateway request failed: {0}")]
    Http(String),

    /// The gateway answered with an error envelope.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    /// The gateway answered something unparseable.
    #[error("unexpected gateway response: {0}")]
    Unexpected(String),
}

/// Result of initializing a checkout transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializedPayment {
    /// Where to send the buyer to complete payment.
    pub authorization_url: String,
    /// The reference the gateway will report back.
    pub reference: String,
}

/// Outcome of verifying a charge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChargeStatus {
    /// The charge settled; `amount` is what the gateway actually captured.
    Success {
        /// Captured amount in minor units.
        amount: Money,
    },
    /// The charge failed.
    Failed {
        /// Gateway failure message.
        reason: String,
    },
    /// The buyer has not completed payment yet.
    Pending,
}

/// A payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initializes a checkout transaction for `amount`, payable by `email`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the gateway call fails.
    async fn initialize(
        &self,
        reference: &str,
        amount: Money,
        email: &str,
    ) -> Result<InitializedPayment, GatewayError>;

    /// Verifies the charge recorded under `reference`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the gateway call fails.
    async fn verify(&self, reference: &str) -> Result<ChargeStatus, GatewayError>;

    /// Initiates a transfer to a recipient under a caller-chosen
    /// reference (the transfer webhooks will report it back).
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the gateway call fails.
    async fn initiate_transfer(
        &self,
        reference: &str,
        recipient_code: &str,
        amount: Money,
        reason: &str,
    ) -> Result<(), GatewayError>;
}
