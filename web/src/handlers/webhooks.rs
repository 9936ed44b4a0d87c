//! Paystack webhook endpoint.
//!
//! The raw body is authenticated with HMAC-SHA512 under the gateway
//! secret before anything is parsed; deliveries are deduplicated by
//! `(reference, event kind)`; settlement itself is idempotent in the
//! store, so replays and out-of-order deliveries are harmless.

use crate::error::AppError;
use crate::handlers::orders::settle_checked;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use boxoffice_auth::providers::PayoutUpdate;
use boxoffice_core::money::Money;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// The webhook envelope Paystack posts.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    event: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    reference: String,
    amount: Option<u64>,
    #[serde(alias = "gateway_response")]
    reason: Option<String>,
}

/// Computes the hex HMAC-SHA512 of `body` under `secret`.
fn signature_for(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time signature check against the header value.
pub(crate) fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    signature_for(secret, body).is_some_and(|expected| {
        constant_time_eq::constant_time_eq(expected.as_bytes(), provided.as_bytes())
    })
}

/// `POST /api/webhooks/paystack` — gateway event ingestion.
///
/// Unsigned or badly signed requests are refused without being parsed.
/// Everything else is acknowledged with 200 once recorded, including
/// replays and events about orders in the wrong state — the gateway
/// should not retry those.
///
/// # Errors
///
/// Returns 401 for signature failures, 400 for unparseable payloads.
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let provided = headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing webhook signature"))?;

    if !verify_signature(&state.config.gateway.secret_key, &body, provided) {
        tracing::warn!("webhook signature mismatch");
        return Err(AppError::unauthorized("invalid webhook signature"));
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("unparseable webhook payload: {e}")))?;

    let first_delivery = state
        .db
        .webhooks()
        .record(&payload.data.reference, &payload.event)
        .await?;
    if !first_delivery {
        tracing::debug!(
            reference = %payload.data.reference,
            event = %payload.event,
            "webhook replay ignored"
        );
        return Ok(StatusCode::OK);
    }

    metrics::counter!("boxoffice_webhooks_received_total").increment(1);

    match payload.event.as_str() {
        "charge.success" => handle_charge_success(&state, &payload.data).await,
        "charge.failed" => handle_charge_failed(&state, &payload.data).await,
        "transfer.success" => handle_transfer(&state, &payload.data, true).await,
        "transfer.failed" | "transfer.reversed" => {
            handle_transfer(&state, &payload.data, false).await
        }
        other => {
            tracing::debug!(event = other, "ignoring unhandled webhook event");
            Ok(())
        }
    }?;

    Ok(StatusCode::OK)
}

async fn handle_charge_success(state: &AppState, data: &WebhookData) -> Result<(), AppError> {
    let Some(amount) = data.amount else {
        tracing::error!(reference = %data.reference, "charge.success without amount");
        return Ok(());
    };

    match settle_checked(state, &data.reference, Money::from_minor(amount)).await {
        Ok(Some(order)) => {
            tracing::info!(order_id = %order.id, reference = %data.reference, "order settled via webhook");
        }
        Ok(None) => {
            tracing::debug!(reference = %data.reference, "charge.success for non-pending order");
        }
        // An unknown reference or a refused amount is logged and
        // acknowledged; retrying will not make it right.
        Err(e) => {
            tracing::error!(reference = %data.reference, error = %e, "charge.success not settled");
        }
    }
    Ok(())
}

async fn handle_charge_failed(state: &AppState, data: &WebhookData) -> Result<(), AppError> {
    match state.db.orders().mark_failed(&data.reference).await {
        Ok(Some(order)) => {
            tracing::info!(
                order_id = %order.id,
                reason = data.reason.as_deref().unwrap_or("unknown"),
                "order failed via webhook"
            );
        }
        Ok(None) => {
            tracing::debug!(reference = %data.reference, "charge.failed for non-pending order");
        }
        Err(e) => {
            tracing::error!(reference = %data.reference, error = %e, "charge.failed not applied");
        }
    }
    Ok(())
}

async fn handle_transfer(
    state: &AppState,
    data: &WebhookData,
    success: bool,
) -> Result<(), AppError> {
    let payout = state
        .db
        .payouts()
        .settle_transfer(&data.reference, success, data.reason.as_deref())
        .await?;

    let Some(payout) = payout else {
        tracing::debug!(reference = %data.reference, "transfer event for unknown or settled payout");
        return Ok(());
    };

    tracing::info!(
        payout_id = %payout.id,
        status = %payout.status,
        "payout settled via webhook"
    );

    match state.db.users().get(payout.organizer_id).await {
        Ok(organizer) => {
            let update = PayoutUpdate {
                amount: payout.amount,
                status: payout.status,
                failure_reason: payout.failure_reason.clone(),
            };
            if let Err(e) = state.email.send_payout_update(&organizer.email, &update).await {
                tracing::error!(payout_id = %payout.id, error = %e, "payout email failed");
            }
        }
        Err(e) => {
            tracing::error!(payout_id = %payout.id, error = %e, "organizer lookup failed");
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "sk_test_123secret456";

    fn sign(secret: &str, body: &[u8]) -> String {
        signature_for(secret, body).unwrap_or_default()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"event":"charge.success","data":{"reference":"bo_1","amount":1000}}"#;
        let signature = sign(SECRET, body);
        assert!(verify_signature(SECRET, body, &signature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"event":"charge.success","data":{"reference":"bo_1","amount":1000}}"#;
        let signature = sign("wrong_secret", body);
        assert!(!verify_signature(SECRET, body, &signature));
    }

    #[test]
    fn modified_payload_is_rejected() {
        let original = br#"{"event":"charge.success","data":{"reference":"bo_1","amount":1000}}"#;
        let modified =
            br#"{"event":"charge.success","data":{"reference":"bo_1","amount":999999}}"#;
        let signature = sign(SECRET, original);
        assert!(!verify_signature(SECRET, modified, &signature));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let body = br#"{"event":"charge.success"}"#;
        assert!(!verify_signature(SECRET, body, "not-a-signature"));
        assert!(!verify_signature(SECRET, body, ""));
    }

    #[test]
    fn payload_parses_the_paystack_shape() {
        let body = br#"{
            "event": "charge.success",
            "data": {
                "reference": "bo_abc123",
                "amount": 21516,
                "gateway_response": "Successful",
                "currency": "NGN"
            }
        }"#;
        let payload: WebhookPayload = serde_json::from_slice(body).unwrap();
        assert_eq!(payload.event, "charge.success");
        assert_eq!(payload.data.reference, "bo_abc123");
        assert_eq!(payload.data.amount, Some(21_516));
        assert_eq!(payload.data.reason.as_deref(), Some("Successful"));
    }
}
