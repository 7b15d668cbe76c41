//! Webhook acknowledgement DTO.

use serde::Serialize;
use utoipa::ToSchema;

/// Body returned to the gateway for every acknowledged delivery.
///
/// The gateway only looks at the HTTP status; the body exists for humans
/// reading delivery logs.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Always `true` on a 2xx response.
    pub received: bool,
    /// How the event was handled, e.g. `"applied"` or `"unknown_order"`.
    pub disposition: String,
}
