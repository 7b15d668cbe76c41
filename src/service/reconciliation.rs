//! Reconciliation engine: opens gateway orders and advances payment intents
//! through the status state machine.
//!
//! Two independent drivers race to fire the same transition: the client's
//! status poll and the gateway's signed webhook. Both converge on
//! [`PaymentIntent::transition`] under the intent's write lock, so whichever
//! arrives first wins and the loser observes a harmless
//! [`TransitionOutcome::AlreadyInStatus`]. Neither path needs to know the
//! other exists.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::{
    Catalog, CustomerInfo, EventBus, GatewayCorrelation, IntentId, IntentStore, PaymentEvent,
    PaymentIntent, PaymentStatus, ReconciliationSource, TransitionOutcome,
};
use crate::error::EngineError;
use crate::gateway::{GatewayOrderState, PaymentGateway, WebhookVerifier};

/// Result of opening an order: everything the storefront client needs to
/// hand the customer to the gateway's hosted payment flow.
#[derive(Debug, Clone)]
pub struct OpenedOrder {
    /// Internal intent id.
    pub intent_id: IntentId,
    /// Gateway-facing order id; the client polls on this.
    pub gateway_order_id: String,
    /// Session token for the gateway's payment widget.
    pub gateway_session_token: String,
    /// Entry fee in minor currency units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
}

/// Projection of an intent returned by the polling path.
#[derive(Debug, Clone)]
pub struct VerifiedStatus {
    /// Internal intent id.
    pub intent_id: IntentId,
    /// Authoritative status after reconciliation.
    pub status: PaymentStatus,
    /// Whether the intent is spin-eligible.
    pub outcome_allowed: bool,
    /// Whether a spin outcome has been recorded.
    pub outcome_recorded: bool,
}

/// How a structurally valid, correctly signed webhook was handled.
///
/// Everything here is acknowledged with a 2xx to the gateway; the variants
/// only drive logging. Returning an error for a race the engine resolves
/// would invite gateway retry storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// The event applied a fresh transition.
    Applied,
    /// A replayed event; the intent already held the target status.
    Duplicate,
    /// The event type carries no state meaning for this engine.
    Ignored,
    /// The referenced order id is not ours; logged and acknowledged.
    UnknownOrder,
    /// The event conflicted with an already-terminal intent (e.g. a late
    /// FAILED after PAID); logged and acknowledged without a state change.
    Conflict,
}

/// Signed event envelope the gateway pushes to the webhook endpoint.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    /// Event discriminator, e.g. `"order.paid"`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub data: WebhookData,
}

/// Payload of a webhook event.
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    /// Gateway order id the event refers to.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Gateway payment id, when a payment attempt exists.
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Payment method used.
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Orchestrates order creation and both reconciliation paths.
///
/// Stateless coordinator in the request path: owns references to the
/// [`IntentStore`] for state, the [`PaymentGateway`] for the outside world,
/// and the [`EventBus`] for event emission. Every mutation follows the
/// pattern: acquire the intent's lock → apply the state machine → emit
/// events → return the authoritative state.
#[derive(Clone)]
pub struct ReconciliationEngine {
    intents: Arc<IntentStore>,
    catalog: Arc<Catalog>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: WebhookVerifier,
    event_bus: EventBus,
    order_expiry: Duration,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("order_expiry", &self.order_expiry)
            .finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(
        intents: Arc<IntentStore>,
        catalog: Arc<Catalog>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
        event_bus: EventBus,
        order_expiry_secs: i64,
    ) -> Self {
        Self {
            intents,
            catalog,
            gateway,
            verifier,
            event_bus,
            order_expiry: Duration::seconds(order_expiry_secs),
        }
    }

    /// Returns a reference to the inner [`IntentStore`].
    #[must_use]
    pub fn intents(&self) -> &Arc<IntentStore> {
        &self.intents
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Opens a payment for one contest entry.
    ///
    /// Resolves the contest, opens the order at the gateway, and only then
    /// persists the PENDING intent, so a row exists iff the gateway knows the
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContestUnavailable`] for absent or inactive
    /// contests and [`EngineError::GatewayUnavailable`] /
    /// [`EngineError::GatewayRejected`] when the gateway call fails.
    pub async fn open_order(
        &self,
        contest_id: uuid::Uuid,
        customer: CustomerInfo,
        user_id: Option<String>,
    ) -> Result<OpenedOrder, EngineError> {
        let contest = self.catalog.active_contest(contest_id).await?;

        let intent = PaymentIntent::new(
            contest_id,
            contest.price_amount,
            contest.currency.clone(),
            customer,
            user_id,
            self.order_expiry,
        );

        let session = self.gateway.create_order(&intent).await?;

        let opened = OpenedOrder {
            intent_id: intent.intent_id,
            gateway_order_id: intent.gateway_order_id.clone(),
            gateway_session_token: session.session_token,
            amount: intent.amount,
            currency: intent.currency.clone(),
        };

        let event = PaymentEvent::IntentCreated {
            intent_id: intent.intent_id,
            contest_id,
            gateway_order_id: intent.gateway_order_id.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            timestamp: Utc::now(),
        };
        self.intents.insert(intent).await?;
        let _ = self.event_bus.publish(event);

        tracing::info!(
            intent_id = %opened.intent_id,
            gateway_order_id = %opened.gateway_order_id,
            %contest_id,
            "payment intent opened"
        );
        Ok(opened)
    }

    /// Polling path: reconciles one intent against the gateway's view.
    ///
    /// Idempotent and safe to call repeatedly; an intent already in a
    /// terminal status is returned without touching the gateway. A PENDING
    /// intent past its expiry is moved to EXPIRED even when the gateway
    /// still reports the order as open.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IntentNotFound`] for unknown order ids and
    /// gateway errors from the status fetch.
    pub async fn poll_order(&self, gateway_order_id: &str) -> Result<VerifiedStatus, EngineError> {
        let entry = self.intents.get_by_gateway_order(gateway_order_id).await?;

        // Terminal statuses never change again; skip the gateway round trip.
        {
            let intent = entry.read().await;
            if intent.status.is_terminal() {
                return Ok(Self::project(&intent));
            }
        }

        let status = self.gateway.fetch_order_status(gateway_order_id).await?;

        let correlation = GatewayCorrelation {
            gateway_payment_id: status.gateway_payment_id,
            payment_method: status.payment_method,
        };
        let target = match status.state {
            GatewayOrderState::Paid => Some(PaymentStatus::Paid),
            GatewayOrderState::Failed => Some(PaymentStatus::Failed),
            GatewayOrderState::Cancelled => Some(PaymentStatus::Cancelled),
            GatewayOrderState::Expired => Some(PaymentStatus::Expired),
            GatewayOrderState::Open => {
                let expired = entry.read().await.is_expired(Utc::now());
                expired.then_some(PaymentStatus::Expired)
            }
            GatewayOrderState::Unknown(raw) => {
                tracing::warn!(%gateway_order_id, status = %raw, "unrecognized gateway status");
                None
            }
        };

        if let Some(target) = target {
            let _ = self
                .apply_transition(&entry, target, correlation, ReconciliationSource::Poll)
                .await?;
        }

        let intent = entry.read().await;
        Ok(Self::project(&intent))
    }

    /// Webhook path: verifies and applies one pushed gateway event.
    ///
    /// The signature is checked over the raw body before anything is
    /// parsed; on mismatch the engine fails closed and takes no state
    /// action. Unknown order ids and late conflicting events are
    /// acknowledged without side effects so the gateway stops retrying.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSignature`] on verification failure,
    /// [`EngineError::InvalidRequest`] for an unparseable body, and
    /// [`EngineError::MissingCorrelationId`] when the event names no order.
    pub async fn apply_webhook(
        &self,
        timestamp: &str,
        signature: &str,
        raw_body: &[u8],
    ) -> Result<WebhookDisposition, EngineError> {
        self.verifier.verify(timestamp, raw_body, signature)?;

        let envelope: WebhookEnvelope = serde_json::from_slice(raw_body)
            .map_err(|e| EngineError::InvalidRequest(format!("malformed webhook body: {e}")))?;

        let order_id = envelope
            .data
            .order_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(EngineError::MissingCorrelationId)?;

        let target = match envelope.event_type.as_str() {
            "order.paid" | "payment.success" => PaymentStatus::Paid,
            "order.failed" | "payment.failed" => PaymentStatus::Failed,
            other => {
                tracing::debug!(event_type = %other, "webhook event carries no state meaning");
                return Ok(WebhookDisposition::Ignored);
            }
        };

        let entry = match self.intents.get_by_gateway_order(order_id).await {
            Ok(entry) => entry,
            Err(EngineError::IntentNotFound(_)) => {
                tracing::warn!(gateway_order_id = %order_id, "webhook for unknown order");
                return Ok(WebhookDisposition::UnknownOrder);
            }
            Err(e) => return Err(e),
        };

        let correlation = GatewayCorrelation {
            gateway_payment_id: envelope.data.payment_id,
            payment_method: envelope.data.payment_method,
        };

        match self
            .apply_transition(&entry, target, correlation, ReconciliationSource::Webhook)
            .await
        {
            Ok(TransitionOutcome::Applied) => Ok(WebhookDisposition::Applied),
            Ok(TransitionOutcome::AlreadyInStatus) => Ok(WebhookDisposition::Duplicate),
            Err(EngineError::InvalidTransition { from, to }) => {
                tracing::warn!(
                    gateway_order_id = %order_id,
                    from,
                    to,
                    "late webhook conflicts with terminal status"
                );
                Ok(WebhookDisposition::Conflict)
            }
            Err(e) => Err(e),
        }
    }

    /// Applies one state-machine edge under the intent's write lock and
    /// emits the `StatusChanged` event when the edge was freshly applied.
    async fn apply_transition(
        &self,
        entry: &Arc<RwLock<PaymentIntent>>,
        target: PaymentStatus,
        correlation: GatewayCorrelation,
        source: ReconciliationSource,
    ) -> Result<TransitionOutcome, EngineError> {
        let mut intent = entry.write().await;
        let from = intent.status;
        let outcome = intent.transition(target, correlation)?;
        let intent_id = intent.intent_id;
        let gateway_order_id = intent.gateway_order_id.clone();
        drop(intent);

        if outcome == TransitionOutcome::Applied {
            let _ = self.event_bus.publish(PaymentEvent::StatusChanged {
                intent_id,
                gateway_order_id,
                from: from.as_str().to_string(),
                to: target.as_str().to_string(),
                source,
                timestamp: Utc::now(),
            });
            tracing::info!(
                %intent_id,
                from = from.as_str(),
                to = target.as_str(),
                ?source,
                "payment status advanced"
            );
        }
        Ok(outcome)
    }

    fn project(intent: &PaymentIntent) -> VerifiedStatus {
        VerifiedStatus {
            intent_id: intent.intent_id,
            status: intent.status,
            outcome_allowed: intent.outcome_allowed,
            outcome_recorded: intent.outcome_recorded,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Contest, WheelRange};
    use crate::gateway::{GatewayOrderStatus, GatewaySession};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SECRET: &str = "whsec_test";

    /// Gateway stub returning a configurable order state.
    #[derive(Debug)]
    struct MockGateway {
        state: Mutex<GatewayOrderState>,
    }

    impl MockGateway {
        fn new(state: GatewayOrderState) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(state),
            })
        }

        fn set_state(&self, state: GatewayOrderState) {
            if let Ok(mut guard) = self.state.lock() {
                *guard = state;
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_order(
            &self,
            _intent: &PaymentIntent,
        ) -> Result<GatewaySession, EngineError> {
            Ok(GatewaySession {
                session_token: "sess_test".to_string(),
            })
        }

        async fn fetch_order_status(
            &self,
            _gateway_order_id: &str,
        ) -> Result<GatewayOrderStatus, EngineError> {
            let state = self
                .state
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or(GatewayOrderState::Open);
            Ok(GatewayOrderStatus {
                state,
                gateway_payment_id: Some("pay_mock".to_string()),
                payment_method: Some("card".to_string()),
            })
        }
    }

    fn make_customer() -> CustomerInfo {
        CustomerInfo {
            name: "Test Customer".to_string(),
            email: "test@example.com".to_string(),
            phone: "+910000000000".to_string(),
        }
    }

    async fn make_engine(
        gateway: Arc<MockGateway>,
    ) -> (ReconciliationEngine, uuid::Uuid, Arc<Catalog>) {
        let catalog = Arc::new(Catalog::new());
        let Ok(range) = WheelRange::new(0, 5) else {
            panic!("valid range");
        };
        let contest_id = uuid::Uuid::new_v4();
        catalog
            .insert_contest(Contest {
                contest_id,
                name: "Launch Week".to_string(),
                price_amount: 100,
                currency: "INR".to_string(),
                wheel_range: range,
                products_per_box: 1,
                active: true,
            })
            .await;

        let engine = ReconciliationEngine::new(
            Arc::new(IntentStore::new()),
            Arc::clone(&catalog),
            gateway,
            WebhookVerifier::new(SECRET, 300),
            EventBus::new(100),
            1800,
        );
        (engine, contest_id, catalog)
    }

    fn paid_webhook(order_id: &str) -> Vec<u8> {
        format!(
            r#"{{"type":"order.paid","data":{{"order_id":"{order_id}","payment_id":"pay_1","payment_method":"upi"}}}}"#
        )
        .into_bytes()
    }

    fn signed(body: &[u8]) -> (String, String) {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let ts = Utc::now().timestamp().to_string();
        let sig = verifier.sign(&ts, body);
        (ts, sig)
    }

    #[tokio::test]
    async fn open_order_creates_pending_intent() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let (engine, contest_id, _) = make_engine(gateway).await;

        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };
        assert_eq!(opened.gateway_session_token, "sess_test");
        assert_eq!(opened.amount, 100);

        let Ok(entry) = engine.intents().get(opened.intent_id).await else {
            panic!("intent not stored");
        };
        let intent = entry.read().await;
        assert_eq!(intent.status, PaymentStatus::Pending);
        assert!(!intent.outcome_allowed);
    }

    #[tokio::test]
    async fn open_order_rejects_inactive_contest() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let (engine, _, _) = make_engine(gateway).await;

        let result = engine
            .open_order(uuid::Uuid::new_v4(), make_customer(), None)
            .await;
        assert!(matches!(result, Err(EngineError::ContestUnavailable(_))));
        assert!(engine.intents().is_empty().await);
    }

    #[tokio::test]
    async fn webhook_then_poll_applies_exactly_one_transition() {
        let gateway = MockGateway::new(GatewayOrderState::Paid);
        let (engine, contest_id, _) = make_engine(Arc::clone(&gateway)).await;
        let mut rx = engine.event_bus().subscribe();

        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };
        let _ = rx.recv().await; // drain IntentCreated

        // Webhook lands first.
        let body = paid_webhook(&opened.gateway_order_id);
        let (ts, sig) = signed(&body);
        let disposition = engine.apply_webhook(&ts, &sig, &body).await;
        assert_eq!(disposition.ok(), Some(WebhookDisposition::Applied));

        // The poll arrives second and loses the race gracefully.
        let Ok(verified) = engine.poll_order(&opened.gateway_order_id).await else {
            panic!("poll failed");
        };
        assert_eq!(verified.status, PaymentStatus::Paid);
        assert!(verified.outcome_allowed);

        // Exactly one StatusChanged event was published.
        let Ok(event) = rx.recv().await else {
            panic!("expected status event");
        };
        assert_eq!(event.event_type_str(), "status_changed");
        assert!(rx.try_recv().is_err(), "no duplicate status event");
    }

    #[tokio::test]
    async fn webhook_replay_is_a_duplicate() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let (engine, contest_id, _) = make_engine(gateway).await;
        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };

        let body = paid_webhook(&opened.gateway_order_id);
        let (ts, sig) = signed(&body);
        let first = engine.apply_webhook(&ts, &sig, &body).await;
        assert_eq!(first.ok(), Some(WebhookDisposition::Applied));

        let second = engine.apply_webhook(&ts, &sig, &body).await;
        assert_eq!(second.ok(), Some(WebhookDisposition::Duplicate));
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_takes_no_state_action() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let (engine, contest_id, _) = make_engine(gateway).await;
        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };

        let body = paid_webhook(&opened.gateway_order_id);
        let ts = Utc::now().timestamp().to_string();
        let bad_sig = WebhookVerifier::new("other_secret", 300).sign(&ts, &body);

        let result = engine.apply_webhook(&ts, &bad_sig, &body).await;
        assert!(matches!(result, Err(EngineError::InvalidSignature)));

        let Ok(entry) = engine.intents().get(opened.intent_id).await else {
            panic!("intent missing");
        };
        assert_eq!(entry.read().await.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn webhook_for_unknown_order_is_acknowledged() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let (engine, _, _) = make_engine(gateway).await;

        let body = paid_webhook("lw_not_ours");
        let (ts, sig) = signed(&body);
        let result = engine.apply_webhook(&ts, &sig, &body).await;
        assert_eq!(result.ok(), Some(WebhookDisposition::UnknownOrder));
    }

    #[tokio::test]
    async fn webhook_without_order_id_is_rejected() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let (engine, _, _) = make_engine(gateway).await;

        let body = br#"{"type":"order.paid","data":{}}"#.to_vec();
        let (ts, sig) = signed(&body);
        let result = engine.apply_webhook(&ts, &sig, &body).await;
        assert!(matches!(result, Err(EngineError::MissingCorrelationId)));
    }

    #[tokio::test]
    async fn late_failed_webhook_after_paid_is_a_conflict() {
        let gateway = MockGateway::new(GatewayOrderState::Paid);
        let (engine, contest_id, _) = make_engine(gateway).await;
        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };
        let Ok(_) = engine.poll_order(&opened.gateway_order_id).await else {
            panic!("poll failed");
        };

        let body = format!(
            r#"{{"type":"order.failed","data":{{"order_id":"{}"}}}}"#,
            opened.gateway_order_id
        )
        .into_bytes();
        let (ts, sig) = signed(&body);
        let result = engine.apply_webhook(&ts, &sig, &body).await;
        assert_eq!(result.ok(), Some(WebhookDisposition::Conflict));

        let Ok(entry) = engine.intents().get(opened.intent_id).await else {
            panic!("intent missing");
        };
        assert_eq!(entry.read().await.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn poll_maps_failed_vocabulary() {
        let gateway = MockGateway::new(GatewayOrderState::Failed);
        let (engine, contest_id, _) = make_engine(gateway).await;
        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };

        let Ok(verified) = engine.poll_order(&opened.gateway_order_id).await else {
            panic!("poll failed");
        };
        assert_eq!(verified.status, PaymentStatus::Failed);
        assert!(!verified.outcome_allowed);
    }

    #[tokio::test]
    async fn stale_pending_order_expires_on_poll() {
        let gateway = MockGateway::new(GatewayOrderState::Open);
        let catalog = Arc::new(Catalog::new());
        let Ok(range) = WheelRange::new(0, 5) else {
            panic!("valid range");
        };
        let contest_id = uuid::Uuid::new_v4();
        catalog
            .insert_contest(Contest {
                contest_id,
                name: "Flash".to_string(),
                price_amount: 100,
                currency: "INR".to_string(),
                wheel_range: range,
                products_per_box: 1,
                active: true,
            })
            .await;

        // Zero-second expiry: the order is already stale by the first poll.
        let engine = ReconciliationEngine::new(
            Arc::new(IntentStore::new()),
            catalog,
            gateway,
            WebhookVerifier::new(SECRET, 300),
            EventBus::new(100),
            0,
        );

        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let Ok(verified) = engine.poll_order(&opened.gateway_order_id).await else {
            panic!("poll failed");
        };
        assert_eq!(verified.status, PaymentStatus::Expired);
    }

    #[tokio::test]
    async fn terminal_intent_polls_without_gateway_round_trip() {
        let gateway = MockGateway::new(GatewayOrderState::Paid);
        let (engine, contest_id, _) = make_engine(Arc::clone(&gateway)).await;
        let Ok(opened) = engine.open_order(contest_id, make_customer(), None).await else {
            panic!("open_order failed");
        };
        let Ok(_) = engine.poll_order(&opened.gateway_order_id).await else {
            panic!("poll failed");
        };

        // Even if the gateway now claims something else, the terminal
        // status is authoritative and never re-fetched.
        gateway.set_state(GatewayOrderState::Failed);
        let Ok(verified) = engine.poll_order(&opened.gateway_order_id).await else {
            panic!("poll failed");
        };
        assert_eq!(verified.status, PaymentStatus::Paid);
    }
}
