//! `POST /payment-webhook`: records a payment reported by the billing
//! provider.
//!
//! When `payments.webhook_secret_env` names a set variable, the raw body must
//! carry a valid `X-Signature-256: sha256=<hex>` HMAC-SHA256 signature.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature-256";

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub user_id: u64,
    pub amount: i64,
    pub status: String,
}

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(secret) = &state.webhook_secret {
        let sig_header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, &body, sig_header) {
            return Err(ApiError::Unauthorized("invalid webhook signature".into()));
        }
    }

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid payment payload: {e}")))?;

    if state.users.get(event.user_id).is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", event.user_id)));
    }

    let payment = state
        .payments
        .record(event.user_id, event.amount, &event.status)?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "payment_id": payment.id,
    })))
}

/// Check a GitHub-style `sha256=<hex>` signature in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], header: &str) -> bool {
    let sig_hex = header.strip_prefix("sha256=").unwrap_or(header);
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());
    computed.as_bytes().ct_eq(sig_hex.as_bytes()).unwrap_u8() == 1
}

/// Signature header value for `body`, as a billing provider would send it.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
