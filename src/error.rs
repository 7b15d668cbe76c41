//! Engine error types with HTTP status code mapping.
//!
//! [`EngineError`] is the central error type for the engine. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//!
//! Race outcomes the engine resolves gracefully (a reconciliation path
//! losing the transition race, a retried spin submission) are deliberately
//! NOT variants here: handlers return the authoritative current state for
//! those instead of an error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4201,
///     "message": "payment not confirmed for intent ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                  |
/// |-----------|---------------------|------------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request              |
/// | 2000–2999 | Not Found / State   | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server              | 500 Internal Server Error    |
/// | 4000–4999 | Payment-Specific    | 401 / 402 / 422 / 502        |
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Submitted outcome lies outside the contest's wheel range.
    #[error("outcome {outcome} outside wheel range [{min}, {max}]")]
    OutcomeOutOfRange {
        /// The rejected outcome value.
        outcome: u32,
        /// Inclusive lower bound of the wheel range.
        min: u32,
        /// Inclusive upper bound of the wheel range.
        max: u32,
    },

    /// Webhook payload carried no gateway order id to correlate on.
    #[error("webhook payload missing gateway order id")]
    MissingCorrelationId,

    /// Contest is absent or not accepting entries.
    #[error("contest unavailable: {0}")]
    ContestUnavailable(uuid::Uuid),

    /// Payment intent with the given identifier was not found.
    #[error("payment intent not found: {0}")]
    IntentNotFound(String),

    /// Requested state-machine edge is not legal from the current status.
    #[error("illegal transition from {from} to {to}")]
    InvalidTransition {
        /// Status the intent currently holds.
        from: &'static str,
        /// Status the caller attempted to apply.
        to: &'static str,
    },

    /// Spin requested before the payment was confirmed.
    #[error("payment not confirmed for intent {0}")]
    NotPaid(String),

    /// Webhook signature verification failed.
    #[error("webhook signature verification failed")]
    InvalidSignature,

    /// Payment gateway unreachable or credentials missing.
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Payment gateway answered but rejected the request.
    #[error("payment gateway rejected request: {0}")]
    GatewayRejected(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::OutcomeOutOfRange { .. } => 1002,
            Self::MissingCorrelationId => 1003,
            Self::ContestUnavailable(_) => 2001,
            Self::IntentNotFound(_) => 2002,
            Self::InvalidTransition { .. } => 2003,
            Self::NotPaid(_) => 4201,
            Self::InvalidSignature => 4101,
            Self::GatewayUnavailable(_) => 4301,
            Self::GatewayRejected(_) => 4302,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::OutcomeOutOfRange { .. }
            | Self::MissingCorrelationId => StatusCode::BAD_REQUEST,
            Self::ContestUnavailable(_) | Self::IntentNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::NotPaid(_) => StatusCode::PAYMENT_REQUIRED,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
