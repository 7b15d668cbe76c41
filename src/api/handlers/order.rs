//! Order endpoints: create a payment order, verify its status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{CreateOrderRequest, CreateOrderResponse, VerifyResponse};
use crate::app_state::AppState;
use crate::domain::CustomerInfo;
use crate::error::{EngineError, ErrorResponse};

/// `POST /orders` — Open a payment for one contest entry.
///
/// # Errors
///
/// Returns [`EngineError`] when the contest is unavailable or the payment
/// gateway cannot be reached.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    summary = "Create a payment order",
    description = "Opens a gateway order for one contest entry and returns the session token the client needs to start the hosted payment flow.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order opened", body = CreateOrderResponse),
        (status = 400, description = "Invalid customer info", body = ErrorResponse),
        (status = 404, description = "Contest unavailable", body = ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, EngineError> {
    if req.customer.name.trim().is_empty() || req.customer.email.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "customer name and email are required".to_string(),
        ));
    }

    let customer = CustomerInfo {
        name: req.customer.name,
        email: req.customer.email,
        phone: req.customer.phone,
    };

    let opened = state
        .reconciliation
        .open_order(req.contest_id, customer, req.user_id)
        .await?;

    let response = CreateOrderResponse {
        intent_id: *opened.intent_id.as_uuid(),
        gateway_order_id: opened.gateway_order_id,
        gateway_session_token: opened.gateway_session_token,
        amount: opened.amount,
        currency: opened.currency,
        created_at: Utc::now(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /orders/{gateway_order_id}/verify` — Reconcile and report status.
///
/// Idempotent and safe to poll repeatedly; this is the client-side half of
/// payment reconciliation.
///
/// # Errors
///
/// Returns [`EngineError`] for unknown order ids or gateway failures.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{gateway_order_id}/verify",
    tag = "Orders",
    summary = "Verify payment status",
    description = "Fetches the order's current status from the gateway, applies any resulting transition, and returns the authoritative state. Safe to poll.",
    params(
        ("gateway_order_id" = String, Path, description = "Gateway-facing order id"),
    ),
    responses(
        (status = 200, description = "Authoritative payment status", body = VerifyResponse),
        (status = 404, description = "Unknown order id", body = ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = ErrorResponse),
    )
)]
pub async fn verify_order(
    State(state): State<AppState>,
    Path(gateway_order_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let verified = state.reconciliation.poll_order(&gateway_order_id).await?;

    Ok(Json(VerifyResponse {
        gateway_order_id,
        intent_id: *verified.intent_id.as_uuid(),
        status: verified.status.as_str().to_string(),
        outcome_allowed: verified.outcome_allowed,
        outcome_recorded: verified.outcome_recorded,
        checked_at: Utc::now(),
    }))
}

/// Order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{gateway_order_id}/verify", get(verify_order))
}
