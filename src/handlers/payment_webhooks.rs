use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};

use crate::{entities::order::OrderStatus, errors::ServiceError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Inbound payment provider webhook.
///
/// Verifies the `Stripe-Signature` HMAC over the raw body, maps the event
/// type to a normalized order status, and hands it to the checkout service.
/// Unknown orders and unhandled event types are logged and acknowledged with
/// 200 anyway: nothing upstream can fix a retry, and redelivery storms help
/// nobody.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payment",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = state.config.payment_webhook_secret.as_deref() {
        let ok = verify_signature(
            &headers,
            &body,
            secret,
            state.config.payment_webhook_tolerance_secs,
        );
        if !ok {
            warn!("Payment webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let json: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let event_type = json.get("type").and_then(|v| v.as_str()).unwrap_or("");
    let object = json.pointer("/data/object");
    let checkout_session_id = object.and_then(|o| o.get("id")).and_then(|v| v.as_str());

    let status = match event_type {
        "checkout.session.completed" => {
            // Payment mode determines whether the session is settled already
            let payment_status = object
                .and_then(|o| o.get("payment_status"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if payment_status == "paid" {
                Some(OrderStatus::Paid)
            } else {
                Some(OrderStatus::Pending)
            }
        }
        "checkout.session.async_payment_succeeded" => Some(OrderStatus::Paid),
        "checkout.session.async_payment_failed" => Some(OrderStatus::PaymentFailed),
        "checkout.session.expired" => Some(OrderStatus::Expired),
        other => {
            info!("Unhandled payment webhook type: {}", other);
            None
        }
    };

    if let (Some(status), Some(session_id)) = (status, checkout_session_id) {
        let occurred_at = json
            .get("created")
            .and_then(|v| v.as_i64())
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        match state
            .services
            .checkout
            .handle_payment_notification(session_id, status, occurred_at)
            .await
        {
            Ok(()) => {}
            // Ack anyway; the order never existed here and a redelivery
            // cannot change that.
            Err(ServiceError::NotFound(msg)) => {
                warn!("Payment webhook for unknown order: {}", msg);
            }
            Err(e) => return Err(e),
        }
    }

    Ok((StatusCode::OK, "ok"))
}

/// Checks the `Stripe-Signature` header (`t=<unix>,v1=<hex hmac>`) against
/// the raw payload. The signed string is `"{t}.{payload}"`; timestamps
/// outside the tolerance window are rejected to blunt replay.
fn verify_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    let Some(sig) = headers.get("Stripe-Signature").and_then(|h| h.to_str().ok()) else {
        return false;
    };

    let mut ts = "";
    let mut v1 = "";
    for part in sig.split(',') {
        let mut it = part.trim().split('=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return false;
    }

    let Ok(ts_i) = ts.parse::<i64>() else {
        return false;
    };
    let now = chrono::Utc::now().timestamp();
    if (now - ts_i).unsigned_abs() > tolerance_secs {
        return false;
    }

    let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap_or(""));
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, v1)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &str, ts: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.{}", ts, payload).as_bytes());
        format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
    }

    fn headers_with(sig: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Stripe-Signature", sig.parse().unwrap());
        headers
    }

    #[test]
    fn valid_signature_passes() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let headers = headers_with(&sign(payload, ts));

        assert!(verify_signature(
            &headers,
            &Bytes::from(payload),
            SECRET,
            300
        ));
    }

    #[test]
    fn tampered_payload_fails() {
        let ts = chrono::Utc::now().timestamp();
        let headers = headers_with(&sign(r#"{"a":1}"#, ts));

        assert!(!verify_signature(
            &headers,
            &Bytes::from(r#"{"a":2}"#),
            SECRET,
            300
        ));
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = r#"{"a":1}"#;
        let ts = chrono::Utc::now().timestamp() - 3600;
        let headers = headers_with(&sign(payload, ts));

        assert!(!verify_signature(
            &headers,
            &Bytes::from(payload),
            SECRET,
            300
        ));
    }

    #[test]
    fn missing_header_fails() {
        assert!(!verify_signature(
            &HeaderMap::new(),
            &Bytes::from("{}"),
            SECRET,
            300
        ));
    }

    #[test]
    fn malformed_header_fails() {
        let headers = headers_with("v1=deadbeef");
        assert!(!verify_signature(&headers, &Bytes::from("{}"), SECRET, 300));
    }
}
