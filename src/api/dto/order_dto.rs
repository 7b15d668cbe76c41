//! Order creation and verification DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer contact details supplied at checkout.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomerDto {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
}

/// Request body for `POST /orders`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Contest the customer wants to play.
    pub contest_id: uuid::Uuid,
    /// Customer contact snapshot.
    pub customer: CustomerDto,
    /// Account id when authenticated; omitted for guest checkout.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Response body for `POST /orders`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    /// Internal intent id; the spin endpoints key on this.
    pub intent_id: uuid::Uuid,
    /// Gateway-facing order id; the verify endpoint keys on this.
    pub gateway_order_id: String,
    /// Session token for the gateway's hosted payment widget.
    pub gateway_session_token: String,
    /// Entry fee in minor currency units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Response body for `GET /orders/{gateway_order_id}/verify`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// Gateway-facing order id that was polled.
    pub gateway_order_id: String,
    /// Internal intent id.
    pub intent_id: uuid::Uuid,
    /// Authoritative payment status after reconciliation.
    pub status: String,
    /// Whether the intent is spin-eligible.
    pub outcome_allowed: bool,
    /// Whether a spin outcome has been recorded.
    pub outcome_recorded: bool,
    /// Poll timestamp.
    pub checked_at: DateTime<Utc>,
}
