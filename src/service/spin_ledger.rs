//! Spin ledger: the write-once gate between payment and reward.
//!
//! The outcome integer itself is supplied by the caller (the wheel
//! animation runs client-side); the ledger's only authority is range
//! enforcement and write-once persistence. However many times the client
//! resubmits, a paid intent settles on exactly one recorded outcome.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    Catalog, EventBus, IntentId, IntentStore, PaymentEvent, PaymentStatus, RecordedOutcome,
};
use crate::error::EngineError;

/// Result of a spin submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinRecord {
    /// The recorded box count: this call's value, or the prior one when
    /// the intent had already been spun.
    pub outcome: u32,
    /// Whether the outcome had been recorded by an earlier call.
    pub already_recorded: bool,
}

/// Read-only projection of an intent's spin state.
///
/// Drives the storefront client's decision between showing the wheel, the
/// result, or a "payment required" screen.
#[derive(Debug, Clone, Copy)]
pub struct SpinStatus {
    /// Current payment status.
    pub status: PaymentStatus,
    /// Whether the intent is spin-eligible.
    pub outcome_allowed: bool,
    /// Whether an outcome has been recorded.
    pub outcome_recorded: bool,
    /// The recorded outcome, if any.
    pub outcome: Option<u32>,
}

/// Enforces "at most one recorded outcome per paid intent".
#[derive(Debug, Clone)]
pub struct SpinLedger {
    intents: Arc<IntentStore>,
    catalog: Arc<Catalog>,
    event_bus: EventBus,
}

impl SpinLedger {
    /// Creates a new ledger.
    #[must_use]
    pub fn new(intents: Arc<IntentStore>, catalog: Arc<Catalog>, event_bus: EventBus) -> Self {
        Self {
            intents,
            catalog,
            event_bus,
        }
    }

    /// Records the spin outcome for a paid intent, write-once.
    ///
    /// Check order matters: payment gating first, then the idempotent
    /// already-recorded answer, then range validation. A retry that
    /// arrives after the outcome is stored gets the stored value back even
    /// if its own payload is garbage.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IntentNotFound`] for unknown intents,
    /// [`EngineError::NotPaid`] unless the payment was confirmed, and
    /// [`EngineError::OutcomeOutOfRange`] for values outside the contest's
    /// wheel range (never stored).
    pub async fn record_outcome(
        &self,
        intent_id: IntentId,
        outcome: u32,
    ) -> Result<SpinRecord, EngineError> {
        let entry = self.intents.get(intent_id).await?;

        let contest_id = {
            let intent = entry.read().await;
            if !intent.outcome_allowed {
                return Err(EngineError::NotPaid(intent_id.to_string()));
            }
            intent.contest_id
        };

        let contest = self.catalog.contest(contest_id).await.ok_or_else(|| {
            EngineError::Internal(format!("contest {contest_id} missing for paid intent"))
        })?;

        let mut intent = entry.write().await;
        // Re-check under the write lock; the status cannot regress but the
        // recorded flag may have been set by a racing submission.
        if intent.outcome_recorded {
            let prior = intent.outcome.unwrap_or(0);
            return Ok(SpinRecord {
                outcome: prior,
                already_recorded: true,
            });
        }

        let range = contest.wheel_range;
        if !range.contains(outcome) {
            return Err(EngineError::OutcomeOutOfRange {
                outcome,
                min: range.min,
                max: range.max,
            });
        }

        let recorded = intent.record_outcome(outcome)?;
        drop(intent);

        match recorded {
            RecordedOutcome::Recorded(value) => {
                let _ = self.event_bus.publish(PaymentEvent::OutcomeRecorded {
                    intent_id,
                    outcome: value,
                    timestamp: Utc::now(),
                });
                tracing::info!(%intent_id, outcome = value, "spin outcome recorded");
                Ok(SpinRecord {
                    outcome: value,
                    already_recorded: false,
                })
            }
            RecordedOutcome::AlreadyRecorded(value) => Ok(SpinRecord {
                outcome: value,
                already_recorded: true,
            }),
        }
    }

    /// Read-only projection of an intent's spin state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IntentNotFound`] for unknown intents.
    pub async fn check_status(&self, intent_id: IntentId) -> Result<SpinStatus, EngineError> {
        let entry = self.intents.get(intent_id).await?;
        let intent = entry.read().await;
        Ok(SpinStatus {
            status: intent.status,
            outcome_allowed: intent.outcome_allowed,
            outcome_recorded: intent.outcome_recorded,
            outcome: intent.outcome,
        })
    }
}
