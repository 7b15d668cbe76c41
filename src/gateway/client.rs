//! Thin adapter to the external payment gateway's REST API.
//!
//! The engine only needs two operations from the gateway: open an order and
//! fetch an order's current status. [`PaymentGateway`] fixes that contract
//! as a trait so the reconciliation engine can be exercised against a mock;
//! [`HttpPaymentGateway`] is the production implementation.
//!
//! The gateway's status vocabulary is wider and woollier than the engine's
//! four terminals; [`GatewayOrderState::parse`] normalizes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::PaymentIntent;
use crate::error::EngineError;

/// Normalized gateway-side order state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOrderState {
    /// Order is open and awaiting payment.
    Open,
    /// Payment captured.
    Paid,
    /// Payment attempt failed.
    Failed,
    /// Order cancelled or terminated.
    Cancelled,
    /// Order passed the gateway's expiry.
    Expired,
    /// A status string this engine does not recognize.
    Unknown(String),
}

impl GatewayOrderState {
    /// Maps the gateway's status vocabulary onto the normalized states.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ACTIVE" | "CREATED" | "OPEN" | "PENDING" => Self::Open,
            "PAID" | "CHARGED" | "SUCCESS" => Self::Paid,
            "FAILED" | "FAILURE" => Self::Failed,
            "CANCELLED" | "CANCELED" | "TERMINATED" => Self::Cancelled,
            "EXPIRED" => Self::Expired,
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Snapshot of an order's state at the gateway, as seen by a status poll.
#[derive(Debug, Clone)]
pub struct GatewayOrderStatus {
    /// Normalized order state.
    pub state: GatewayOrderState,
    /// Payment id the gateway assigned, once a payment attempt exists.
    pub gateway_payment_id: Option<String>,
    /// Payment method used, once known.
    pub payment_method: Option<String>,
}

/// What the gateway hands back when an order is opened: the token the
/// storefront client needs to start the hosted payment flow.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    /// Opaque session token for the client-side payment widget.
    pub session_token: String,
}

/// Contract the reconciliation engine requires from the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a monetary order for the given intent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GatewayUnavailable`] when the gateway cannot
    /// be reached or credentials are missing, and
    /// [`EngineError::GatewayRejected`] when it refuses the order.
    async fn create_order(&self, intent: &PaymentIntent) -> Result<GatewaySession, EngineError>;

    /// Fetches the current status of a previously opened order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GatewayUnavailable`] when the gateway cannot
    /// be reached, and [`EngineError::GatewayRejected`] when it does not
    /// recognize the order.
    async fn fetch_order_status(
        &self,
        gateway_order_id: &str,
    ) -> Result<GatewayOrderStatus, EngineError>;
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    order_id: &'a str,
    order_amount: i64,
    order_currency: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderReply {
    payment_session_token: String,
}

#[derive(Deserialize)]
struct OrderStatusReply {
    order_status: String,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
}

/// Production gateway client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpPaymentGateway {
    /// Builds a client with the given base URL, credentials, and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        base_url: String,
        api_key: String,
        api_secret: String,
        timeout_secs: u64,
    ) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EngineError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            api_secret,
        })
    }

    fn credentials(&self) -> Result<(), EngineError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(EngineError::GatewayUnavailable(
                "gateway credentials not configured".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(&self, intent: &PaymentIntent) -> Result<GatewaySession, EngineError> {
        self.credentials()?;

        let body = CreateOrderBody {
            order_id: &intent.gateway_order_id,
            order_amount: intent.amount,
            order_currency: &intent.currency,
            customer_name: &intent.customer.name,
            customer_email: &intent.customer.email,
            customer_phone: &intent.customer.phone,
        };

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .header("x-client-id", &self.api_key)
            .header("x-client-secret", &self.api_secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(EngineError::GatewayUnavailable(format!(
                "order create returned {status}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::GatewayRejected(format!("{status}: {detail}")));
        }

        let reply: CreateOrderReply = response
            .json()
            .await
            .map_err(|e| EngineError::GatewayUnavailable(format!("malformed reply: {e}")))?;

        Ok(GatewaySession {
            session_token: reply.payment_session_token,
        })
    }

    async fn fetch_order_status(
        &self,
        gateway_order_id: &str,
    ) -> Result<GatewayOrderStatus, EngineError> {
        self.credentials()?;

        let response = self
            .http
            .get(format!("{}/orders/{gateway_order_id}", self.base_url))
            .header("x-client-id", &self.api_key)
            .header("x-client-secret", &self.api_secret)
            .send()
            .await
            .map_err(|e| EngineError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(EngineError::GatewayUnavailable(format!(
                "status fetch returned {status}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::GatewayRejected(format!("{status}: {detail}")));
        }

        let reply: OrderStatusReply = response
            .json()
            .await
            .map_err(|e| EngineError::GatewayUnavailable(format!("malformed reply: {e}")))?;

        Ok(GatewayOrderStatus {
            state: GatewayOrderState::parse(&reply.order_status),
            gateway_payment_id: reply.payment_id,
            payment_method: reply.payment_method,
        })
    }
}
