//! Processor notification endpoint.
//!
//! The processor retries deliveries, so every outcome the order can already
//! be in must answer 200; only transport-level problems (bad signature, bad
//! payload, unknown order) get error statuses that make the processor retry
//! or alert.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{info, warn};

use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Notification body. `order_id` and `status` are required; a delivery
/// without them is malformed, not merely unknown.
#[derive(Debug, Deserialize)]
pub struct Notification {
    pub order_id: i64,
    pub status: String,
    #[serde(default)]
    pub charge_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    // POST only; axum answers 405 for other methods on the path
    Router::new().route("/payments/webhook", post(payment_webhook))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Notification accepted"),
        (status = 400, description = "Malformed payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        if !verify_signature(&headers, &body, secret, state.config.webhook_tolerance_secs) {
            warn!("webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let notification: Notification = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid notification payload: {e}")))?;

    let order = state
        .store
        .get_order(notification.order_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("order {} not found", notification.order_id))
        })?;

    let status = notification.status.to_ascii_uppercase();
    match status.as_str() {
        "AWAITING_ISSUE" | "PENDING" => {
            if !order.is_paid() {
                state
                    .store
                    .set_status(
                        order.id,
                        OrderStatus::OnHold,
                        &format!("Processor reported payment {}.", status.to_lowercase()),
                    )
                    .await?;
                state
                    .events
                    .send(Event::OrderStatusChanged {
                        order_id: order.id,
                        new_status: OrderStatus::OnHold,
                    })
                    .await;
            }
        }
        "RECEIVED" | "CONFIRMED" => {
            if order.is_paid() {
                info!(order_id = order.id, "order already paid; notification is a no-op");
            } else {
                let transaction_id = notification.charge_id.clone().unwrap_or_default();
                state.store.mark_paid(order.id, &transaction_id).await?;
                state
                    .store
                    .add_note(order.id, "Payment confirmed by the processor.")
                    .await?;
                state
                    .events
                    .send(Event::PaymentConfirmed {
                        order_id: order.id,
                        transaction_id: notification.charge_id.clone(),
                    })
                    .await;
            }
        }
        "CANCELED" => {
            if !order.is_paid() {
                state
                    .store
                    .set_status(
                        order.id,
                        OrderStatus::Failed,
                        "Payment canceled by the processor.",
                    )
                    .await?;
                state
                    .events
                    .send(Event::PaymentFailed {
                        order_id: order.id,
                        reason: "canceled by processor".into(),
                    })
                    .await;
            }
        }
        other => {
            // Unknown statuses are acknowledged and ignored so new processor
            // states never cause a retry storm
            info!(order_id = order.id, status = %other, "ignoring unhandled notification status");
        }
    }

    Ok((StatusCode::OK, Json(json!({ "ok": true }))))
}

/// HMAC-SHA256 over `{timestamp}.{body}`, hex-encoded in `x-signature` with
/// the timestamp echoed in `x-timestamp`. Stale timestamps fail closed.
fn verify_signature(headers: &HeaderMap, payload: &Bytes, secret: &str, tolerance_secs: u64) -> bool {
    let (Some(ts), Some(sig)) = (header_str(headers, "x-timestamp"), header_str(headers, "x-signature"))
    else {
        return false;
    };

    match ts.parse::<i64>() {
        Ok(ts_i) => {
            let now = chrono::Utc::now().timestamp();
            if (now - ts_i).unsigned_abs() > tolerance_secs {
                return false;
            }
        }
        Err(_) => return false,
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(ts.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, sig)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
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
