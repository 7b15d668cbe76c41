//! Spin endpoints: submit the outcome, check spin state, collect rewards.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    RewardAssignmentResponse, SpinStatusResponse, UseSpinRequest, UseSpinResponse,
};
use crate::app_state::AppState;
use crate::domain::IntentId;
use crate::error::{EngineError, ErrorResponse};

/// `POST /spins/{intent_id}` — Record the spin outcome, write-once.
///
/// A resubmission (network retry, double-tap) returns the previously
/// recorded outcome unchanged instead of erroring.
///
/// # Errors
///
/// Returns [`EngineError`] when the intent is unknown, unpaid, or the
/// outcome lies outside the contest's wheel range.
#[utoipa::path(
    post,
    path = "/api/v1/spins/{intent_id}",
    tag = "Spins",
    summary = "Record a spin outcome",
    description = "Records the box count the wheel landed on. Exactly one outcome is recorded per paid intent; retries get the recorded value back.",
    params(
        ("intent_id" = uuid::Uuid, Path, description = "Payment intent UUID"),
    ),
    request_body = UseSpinRequest,
    responses(
        (status = 200, description = "Outcome recorded (or previously recorded)", body = UseSpinResponse),
        (status = 400, description = "Outcome outside wheel range", body = ErrorResponse),
        (status = 402, description = "Payment not confirmed", body = ErrorResponse),
        (status = 404, description = "Unknown intent", body = ErrorResponse),
    )
)]
pub async fn use_spin(
    State(state): State<AppState>,
    Path(intent_id): Path<uuid::Uuid>,
    Json(req): Json<UseSpinRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let record = state
        .spin_ledger
        .record_outcome(IntentId::from_uuid(intent_id), req.outcome)
        .await?;

    Ok(Json(UseSpinResponse {
        intent_id,
        outcome: record.outcome,
        already_recorded: record.already_recorded,
    }))
}

/// `GET /spins/{intent_id}` — Read-only spin state projection.
///
/// # Errors
///
/// Returns [`EngineError::IntentNotFound`] for unknown intents.
#[utoipa::path(
    get,
    path = "/api/v1/spins/{intent_id}",
    tag = "Spins",
    summary = "Check spin state",
    description = "Returns the projection the client uses to decide between showing the wheel, the result, or a payment-required screen.",
    params(
        ("intent_id" = uuid::Uuid, Path, description = "Payment intent UUID"),
    ),
    responses(
        (status = 200, description = "Spin state", body = SpinStatusResponse),
        (status = 404, description = "Unknown intent", body = ErrorResponse),
    )
)]
pub async fn check_spin(
    State(state): State<AppState>,
    Path(intent_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let status = state
        .spin_ledger
        .check_status(IntentId::from_uuid(intent_id))
        .await?;

    Ok(Json(SpinStatusResponse {
        intent_id,
        status: status.status.as_str().to_string(),
        outcome_allowed: status.outcome_allowed,
        outcome_recorded: status.outcome_recorded,
        outcome: status.outcome,
    }))
}

/// `POST /spins/{intent_id}/rewards` — Allocate inventory to the boxes.
///
/// Idempotent: repeat calls return the existing assignment without
/// touching stock again.
///
/// # Errors
///
/// Returns [`EngineError`] when the intent is unknown, unpaid, or has no
/// recorded outcome yet.
#[utoipa::path(
    post,
    path = "/api/v1/spins/{intent_id}/rewards",
    tag = "Spins",
    summary = "Allocate box rewards",
    description = "Converts the recorded outcome into concrete inventory items, decrementing stock. Boxes may come back partially empty when the pool is exhausted.",
    params(
        ("intent_id" = uuid::Uuid, Path, description = "Payment intent UUID"),
    ),
    responses(
        (status = 200, description = "Reward assignment", body = RewardAssignmentResponse),
        (status = 400, description = "No outcome recorded yet", body = ErrorResponse),
        (status = 402, description = "Payment not confirmed", body = ErrorResponse),
        (status = 404, description = "Unknown intent", body = ErrorResponse),
    )
)]
pub async fn allocate_rewards(
    State(state): State<AppState>,
    Path(intent_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let assignment = state
        .allocator
        .allocate(IntentId::from_uuid(intent_id))
        .await?;

    Ok(Json(RewardAssignmentResponse::from(assignment.as_ref())))
}

/// Spin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/spins/{intent_id}", post(use_spin).get(check_spin))
        .route("/spins/{intent_id}/rewards", post(allocate_rewards))
}
