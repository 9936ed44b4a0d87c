//! Mock payment gateway for development and tests. Always succeeds.

use super::{ChargeStatus, GatewayError, InitializedPayment, PaymentGateway};
use async_trait::async_trait;
use boxoffice_core::money::Money;
use std::collections::HashMap;
use std::sync::Mutex;

/// Gateway that records charges in memory and approves everything.
#[derive(Default)]
pub struct MockGateway {
    charges: Mutex<HashMap<String, Money>>,
}

impl MockGateway {
    /// Creates an empty mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)] // mock: lock poisoning is a test bug
impl PaymentGateway for MockGateway {
    async fn initialize(
        &self,
        reference: &str,
        amount: Money,
        _email: &str,
    ) -> Result<InitializedPayment, GatewayError> {
        self.charges
            .lock()
            .unwrap()
            .insert(reference.to_string(), amount);

        tracing::info!(reference, amount = %amount, "mock transaction initialized");

        Ok(InitializedPayment {
            authorization_url: format!("https://checkout.mock/{reference}"),
            reference: reference.to_string(),
        })
    }

    async fn verify(&self, reference: &str) -> Result<ChargeStatus, GatewayError> {
        let charges = self.charges.lock().unwrap();
        charges.get(reference).map_or(
            Ok(ChargeStatus::Failed {
                reason: "unknown reference".into(),
            }),
            |amount| Ok(ChargeStatus::Success { amount: *amount }),
        )
    }

    async fn initiate_transfer(
        &self,
        reference: &str,
        _recipient_code: &str,
        amount: Money,
        _reason: &str,
    ) -> Result<(), GatewayError> {
        tracing::info!(amount = %amount, reference, "mock transfer initiated");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialized_charge_verifies_successfully() {
        let gateway = MockGateway::new();
        let init = gateway
            .initialize("ref-1", Money::from_minor(5_000), "buyer@example.com")
            .await
            .unwrap();
        assert_eq!(init.reference, "ref-1");

        let status = gateway.verify("ref-1").await.unwrap();
        assert_eq!(
            status,
            ChargeStatus::Success {
                amount: Money::from_minor(5_000)
            }
        );
    }

    #[tokio::test]
    async fn unknown_reference_fails_verification() {
        let gateway = MockGateway::new();
        let status = gateway.verify("nope").await.unwrap();
        assert!(matches!(status, ChargeStatus::Failed { .. }));
    }
}
