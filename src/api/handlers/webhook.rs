//! Payment gateway webhook endpoint.
//!
//! The body must stay raw until the signature is verified: the HMAC is
//! computed over the exact bytes the gateway sent, so this handler takes
//! [`Bytes`] rather than a `Json` extractor.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::WebhookAck;
use crate::app_state::AppState;
use crate::error::{EngineError, ErrorResponse};
use crate::service::WebhookDisposition;

/// Header carrying the hex-encoded HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Header carrying the unix-seconds timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

/// `POST /webhooks/payment` — Receive a signed gateway event.
///
/// Responds 401 on signature failure, 400 on a missing correlation id or
/// unparseable body, and 200 otherwise, including for events referencing
/// unknown orders, which are logged but must not be retried by the
/// gateway.
///
/// # Errors
///
/// Returns [`EngineError::InvalidSignature`] for missing or bad
/// signature/timestamp headers and [`EngineError::MissingCorrelationId`]
/// when the event names no order.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payment",
    tag = "Webhooks",
    summary = "Payment gateway webhook",
    description = "Verifies the HMAC signature over the raw body and applies the reported terminal payment event.",
    request_body(content = Vec<u8>, description = "Raw signed webhook payload"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Missing correlation id or malformed body", body = ErrorResponse),
        (status = 401, description = "Signature verification failed", body = ErrorResponse),
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, EngineError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(EngineError::InvalidSignature)?;
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(EngineError::InvalidSignature)?;

    let disposition = state
        .reconciliation
        .apply_webhook(timestamp, signature, &body)
        .await?;

    let disposition = match disposition {
        WebhookDisposition::Applied => "applied",
        WebhookDisposition::Duplicate => "duplicate",
        WebhookDisposition::Ignored => "ignored",
        WebhookDisposition::UnknownOrder => "unknown_order",
        WebhookDisposition::Conflict => "conflict",
    };

    Ok(Json(WebhookAck {
        received: true,
        disposition: disposition.to_string(),
    }))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/payment", post(payment_webhook))
}
