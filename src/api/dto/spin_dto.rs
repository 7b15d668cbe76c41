//! Spin submission, status, and reward DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::RewardAssignment;

/// Request body for `POST /spins/{intent_id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UseSpinRequest {
    /// The box count the wheel landed on.
    pub outcome: u32,
}

/// Response body for `POST /spins/{intent_id}`.
///
/// A resubmission returns the previously recorded outcome with
/// `already_recorded = true`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UseSpinResponse {
    /// Intent the outcome belongs to.
    pub intent_id: uuid::Uuid,
    /// The authoritative recorded outcome.
    pub outcome: u32,
    /// Whether an earlier submission had already recorded it.
    pub already_recorded: bool,
}

/// Response body for `GET /spins/{intent_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SpinStatusResponse {
    /// Intent id.
    pub intent_id: uuid::Uuid,
    /// Current payment status.
    pub status: String,
    /// Whether the intent is spin-eligible.
    pub outcome_allowed: bool,
    /// Whether an outcome has been recorded.
    pub outcome_recorded: bool,
    /// The recorded outcome, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<u32>,
}

/// One assigned inventory item.
#[derive(Debug, Serialize, ToSchema)]
pub struct RewardItemDto {
    /// Inventory item id.
    pub item_id: uuid::Uuid,
    /// Item name at allocation time.
    pub name: String,
    /// Rarity tier at allocation time.
    pub rarity_tier: u8,
}

/// One mystery box.
#[derive(Debug, Serialize, ToSchema)]
pub struct RewardBoxDto {
    /// Items in this box; may be empty.
    pub items: Vec<RewardItemDto>,
}

/// Response body for `POST /spins/{intent_id}/rewards`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RewardAssignmentResponse {
    /// Intent the assignment fulfils.
    pub intent_id: uuid::Uuid,
    /// Contest the items were drawn from.
    pub contest_id: uuid::Uuid,
    /// The recorded spin outcome.
    pub outcome: u32,
    /// The boxes, in wheel order.
    pub boxes: Vec<RewardBoxDto>,
    /// Item slots left unfilled by pool exhaustion.
    pub shortfall: u32,
    /// Allocation timestamp.
    pub allocated_at: DateTime<Utc>,
}

impl From<&RewardAssignment> for RewardAssignmentResponse {
    fn from(assignment: &RewardAssignment) -> Self {
        Self {
            intent_id: *assignment.intent_id.as_uuid(),
            contest_id: assignment.contest_id,
            outcome: assignment.outcome,
            boxes: assignment
                .boxes
                .iter()
                .map(|b| RewardBoxDto {
                    items: b
                        .items
                        .iter()
                        .map(|item| RewardItemDto {
                            item_id: item.item_id,
                            name: item.name.clone(),
                            rarity_tier: item.rarity_tier,
                        })
                        .collect(),
                })
                .collect(),
            shortfall: assignment.shortfall,
            allocated_at: assignment.allocated_at,
        }
    }
}
