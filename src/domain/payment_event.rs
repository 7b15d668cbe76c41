//! Domain events reflecting payment and allocation state mutations.
//!
//! Every state change emits a [`PaymentEvent`] through the
//! [`super::EventBus`]. Events are appended to the PostgreSQL event log when
//! persistence is enabled, forming the append-only status history for each
//! intent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::IntentId;

/// Which reconciliation channel observed a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationSource {
    /// Client-driven status poll against the gateway.
    Poll,
    /// Signed server-to-server webhook push from the gateway.
    Webhook,
}

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PaymentEvent {
    /// Emitted when a new payment intent is opened.
    IntentCreated {
        /// Intent identifier.
        intent_id: IntentId,
        /// Contest being played.
        contest_id: Uuid,
        /// Gateway-facing order id.
        gateway_order_id: String,
        /// Entry fee in minor currency units.
        amount: i64,
        /// ISO-4217 currency code.
        currency: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reconciliation path applies a status transition.
    StatusChanged {
        /// Intent identifier.
        intent_id: IntentId,
        /// Gateway-facing order id.
        gateway_order_id: String,
        /// Status before the transition.
        from: String,
        /// Status after the transition.
        to: String,
        /// Which channel won the race to apply it.
        source: ReconciliationSource,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when the write-once spin outcome is recorded.
    OutcomeRecorded {
        /// Intent identifier.
        intent_id: IntentId,
        /// The recorded box count.
        outcome: u32,
        /// Recording timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when inventory is allocated to an intent's boxes.
    RewardAllocated {
        /// Intent identifier.
        intent_id: IntentId,
        /// Number of boxes in the assignment.
        boxes: u32,
        /// Total items assigned across boxes.
        items_assigned: u32,
        /// Item slots left empty by pool exhaustion.
        shortfall: u32,
        /// Allocation timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl PaymentEvent {
    /// The intent this event belongs to.
    #[must_use]
    pub const fn intent_id(&self) -> IntentId {
        match self {
            Self::IntentCreated { intent_id, .. }
            | Self::StatusChanged { intent_id, .. }
            | Self::OutcomeRecorded { intent_id, .. }
            | Self::RewardAllocated { intent_id, .. } => *intent_id,
        }
    }

    /// Stable event type discriminator for the event log.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::IntentCreated { .. } => "intent_created",
            Self::StatusChanged { .. } => "status_changed",
            Self::OutcomeRecorded { .. } => "outcome_recorded",
            Self::RewardAllocated { .. } => "reward_allocated",
        }
    }
}
