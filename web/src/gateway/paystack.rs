//! Paystack API client.
//!
//! Speaks the transaction and transfer endpoints with the standard
//! `{ status, message, data }` envelope. Amounts cross the wire in minor
//! units, as Paystack expects.

use super::{ChargeStatus, GatewayError, InitializedPayment, PaymentGateway};
use async_trait::async_trait;
use boxoffice_core::money::Money;
use serde::{Deserialize, Serialize};

/// Client for the Paystack HTTP API.
pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Serialize)]
struct InitializeRequest<'a> {
    reference: &'a str,
    amount: u64,
    email: &'a str,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
    amount: u64,
    gateway_response: Option<String>,
}

#[derive(Serialize)]
struct TransferRequest<'a> {
    source: &'a str,
    reference: &'a str,
    recipient: &'a str,
    amount: u64,
    reason: &'a str,
}

#[derive(Deserialize)]
struct TransferData {
    reference: String,
}

impl PaystackGateway {
    /// Creates a client against `base_url` with the account's secret key.
    #[must_use]
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        Self::unwrap_envelope(response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Unexpected(e.to_string()))?;

        if !envelope.status {
            return Err(GatewayError::Rejected(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Unexpected("missing data in gateway response".into()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        reference: &str,
        amount: Money,
        email: &str,
    ) -> Result<InitializedPayment, GatewayError> {
        let data: InitializeData = self
            .post(
                "/transaction/initialize",
                &InitializeRequest {
                    reference,
                    amount: amount.minor(),
                    email,
                },
            )
            .await?;

        tracing::info!(reference, amount = %amount, "gateway transaction initialized");

        Ok(InitializedPayment {
            authorization_url: data.authorization_url,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<ChargeStatus, GatewayError> {
        let data: VerifyData = self.get(&format!("/transaction/verify/{reference}")).await?;

        let status = match data.status.as_str() {
            "success" => ChargeStatus::Success {
                amount: Money::from_minor(data.amount),
            },
            "failed" => ChargeStatus::Failed {
                reason: data
                    .gateway_response
                    .unwrap_or_else(|| "declined".to_string()),
            },
            _ => ChargeStatus::Pending,
        };

        Ok(status)
    }

    async fn initiate_transfer(
        &self,
        reference: &str,
        recipient_code: &str,
        amount: Money,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let data: TransferData = self
            .post(
                "/transfer",
                &TransferRequest {
                    source: "balance",
                    reference,
                    recipient: recipient_code,
                    amount: amount.minor(),
                    reason,
                },
            )
            .await?;

        tracing::info!(
            recipient = recipient_code,
            amount = %amount,
            reference = %data.reference,
            "gateway transfer initiated"
        );

        Ok(())
    }
}
