//! Payment intent aggregate and its status state machine.
//!
//! A [`PaymentIntent`] records one purchase attempt tied to one contest
//! entry. It is created `PENDING`, advanced to exactly one terminal status
//! by the reconciliation engine, and carries the write-once spin outcome.
//! Intents are never deleted; they are the audit trail for a monetary
//! transaction.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::IntentId;
use crate::error::EngineError;

/// Payment lifecycle status.
///
/// The only legal edges are `Pending → Paid | Failed | Cancelled | Expired`.
/// No edge leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Gateway order opened, payment not yet observed.
    Pending,
    /// Payment confirmed by the gateway (success terminal).
    Paid,
    /// Payment attempt failed at the gateway.
    Failed,
    /// Customer or gateway cancelled the order.
    Cancelled,
    /// Order passed its expiry without a payment.
    Expired,
}

impl PaymentStatus {
    /// Returns `true` for every status except [`PaymentStatus::Pending`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Stable uppercase name used in API responses and the event log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying a state-machine edge.
///
/// Both reconciliation paths call [`PaymentIntent::transition`] for the same
/// terminal event; whichever arrives first gets [`TransitionOutcome::Applied`]
/// and the loser gets [`TransitionOutcome::AlreadyInStatus`]. Callers treat
/// both as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The edge was applied by this call.
    Applied,
    /// The intent already held the target status; nothing changed.
    AlreadyInStatus,
}

/// Result of recording a spin outcome on an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedOutcome {
    /// This call stored the outcome.
    Recorded(u32),
    /// An outcome was already stored; the previously recorded value is
    /// returned so a retrying client gets a consistent answer.
    AlreadyRecorded(u32),
}

impl RecordedOutcome {
    /// The outcome value, regardless of which caller stored it.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Recorded(v) | Self::AlreadyRecorded(v) => v,
        }
    }
}

/// Customer contact snapshot captured at order creation.
///
/// Immutable once created: later profile edits in the account subsystem
/// must not rewrite what the customer looked like when they paid.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerInfo {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
}

/// Gateway correlation fields attached when a transition is observed.
#[derive(Debug, Clone, Default)]
pub struct GatewayCorrelation {
    /// Payment identifier assigned by the gateway, if reported.
    pub gateway_payment_id: Option<String>,
    /// Payment method the customer used (e.g. `"card"`, `"upi"`).
    pub payment_method: Option<String>,
}

/// One purchase attempt tied to one contest entry.
#[derive(Debug)]
pub struct PaymentIntent {
    /// Internal intent identifier (immutable after creation).
    pub intent_id: IntentId,

    /// Gateway-facing order identifier. Unique and stable for the lifetime
    /// of the intent; the idempotency key for webhook replay.
    pub gateway_order_id: String,

    /// Contest this entry plays.
    pub contest_id: Uuid,

    /// Opaque account id when the request was authenticated; `None` for
    /// guest checkout.
    pub user_id: Option<String>,

    /// Entry fee in minor currency units.
    pub amount: i64,

    /// ISO-4217 currency code.
    pub currency: String,

    /// Customer contact snapshot (immutable).
    pub customer: CustomerInfo,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// Set `true` exactly once, when the PAID transition is applied.
    pub outcome_allowed: bool,

    /// Whether a spin outcome has been recorded.
    pub outcome_recorded: bool,

    /// The recorded box count, present iff `outcome_recorded`.
    pub outcome: Option<u32>,

    /// Payment id reported by the gateway, once known.
    pub gateway_payment_id: Option<String>,

    /// Payment method reported by the gateway, once known.
    pub payment_method: Option<String>,

    /// When the PAID transition was applied.
    pub paid_at: Option<DateTime<Utc>>,

    /// Creation timestamp (immutable).
    pub created_at: DateTime<Utc>,

    /// Instant after which a still-PENDING order counts as expired.
    pub expires_at: DateTime<Utc>,

    /// Timestamp of the last state mutation.
    pub last_modified_at: DateTime<Utc>,
}

impl PaymentIntent {
    /// Creates a PENDING intent with fresh intent and gateway order ids.
    #[must_use]
    pub fn new(
        contest_id: Uuid,
        amount: i64,
        currency: String,
        customer: CustomerInfo,
        user_id: Option<String>,
        expiry: Duration,
    ) -> Self {
        let now = Utc::now();
        let intent_id = IntentId::new();
        // The gateway order id doubles as the merchant order reference on
        // the gateway side; it must never collide across intents.
        let gateway_order_id = format!("lw_{}", Uuid::new_v4().simple());
        Self {
            intent_id,
            gateway_order_id,
            contest_id,
            user_id,
            amount,
            currency,
            customer,
            status: PaymentStatus::Pending,
            outcome_allowed: false,
            outcome_recorded: false,
            outcome: None,
            gateway_payment_id: None,
            payment_method: None,
            paid_at: None,
            created_at: now,
            expires_at: now + expiry,
            last_modified_at: now,
        }
    }

    /// Applies a state-machine edge.
    ///
    /// Re-applying the status the intent already holds is a no-op reported
    /// as [`TransitionOutcome::AlreadyInStatus`]; this is what lets the
    /// polling path and the webhook path race on the same terminal event
    /// without coordination. On a fresh PAID transition the intent becomes
    /// spin-eligible (`outcome_allowed = true`) and `paid_at` is stamped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when the edge is not
    /// legal from the current status: any edge out of a terminal status,
    /// or any edge targeting `Pending`.
    pub fn transition(
        &mut self,
        target: PaymentStatus,
        correlation: GatewayCorrelation,
    ) -> Result<TransitionOutcome, EngineError> {
        if self.status == target {
            return Ok(TransitionOutcome::AlreadyInStatus);
        }
        if self.status.is_terminal() || !target.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: self.status.as_str(),
                to: target.as_str(),
            });
        }

        let now = Utc::now();
        self.status = target;
        if let Some(payment_id) = correlation.gateway_payment_id {
            self.gateway_payment_id = Some(payment_id);
        }
        if let Some(method) = correlation.payment_method {
            self.payment_method = Some(method);
        }
        if target == PaymentStatus::Paid {
            self.outcome_allowed = true;
            self.paid_at = Some(now);
        }
        self.last_modified_at = now;
        Ok(TransitionOutcome::Applied)
    }

    /// Records the spin outcome, write-once.
    ///
    /// The caller is responsible for range validation against the contest's
    /// wheel range; this method only enforces payment gating and the
    /// write-once invariant.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotPaid`] unless `outcome_allowed` is set.
    pub fn record_outcome(&mut self, outcome: u32) -> Result<RecordedOutcome, EngineError> {
        if !self.outcome_allowed {
            return Err(EngineError::NotPaid(self.intent_id.to_string()));
        }
        if self.outcome_recorded {
            // `outcome` is always present when `outcome_recorded` is set.
            let prior = self.outcome.unwrap_or(0);
            return Ok(RecordedOutcome::AlreadyRecorded(prior));
        }
        self.outcome = Some(outcome);
        self.outcome_recorded = true;
        self.last_modified_at = Utc::now();
        Ok(RecordedOutcome::Recorded(outcome))
    }

    /// Whether a still-PENDING order has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending && now > self.expires_at
    }
}
