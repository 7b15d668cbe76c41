//! Concurrent payment intent storage with per-intent fine-grained locking.
//!
//! [`IntentStore`] stores all payment intents in a `HashMap` where each
//! entry is individually protected by a [`tokio::sync::RwLock`]. This
//! serializes writes per intent (the polling path and the webhook path for
//! the same intent contend only on that intent's lock) while operations on
//! different intents proceed fully in parallel.
//!
//! Intents are never removed: a row that once represented money changing
//! hands stays addressable for its whole lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::IntentId;
use super::payment_intent::PaymentIntent;
use crate::error::EngineError;

/// Central store for all payment intents.
///
/// Uses a `RwLock<HashMap<...>>` for the outer maps and per-entry
/// `Arc<RwLock<PaymentIntent>>` for fine-grained per-intent locking.
/// A secondary index maps the gateway-facing order id back to the intent,
/// which is how webhook events and status polls find their row.
///
/// # Concurrency
///
/// - Multiple tasks may read the same intent concurrently.
/// - Writes to different intents are concurrent.
/// - Writes to the same intent are serialized.
#[derive(Debug)]
pub struct IntentStore {
    intents: RwLock<HashMap<IntentId, Arc<RwLock<PaymentIntent>>>>,
    by_gateway_order: RwLock<HashMap<String, IntentId>>,
}

impl IntentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
            by_gateway_order: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a new intent, indexing it by both identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] if either identifier already exists
    /// (should never happen with freshly generated UUIDs).
    pub async fn insert(&self, intent: PaymentIntent) -> Result<IntentId, EngineError> {
        let intent_id = intent.intent_id;
        let gateway_order_id = intent.gateway_order_id.clone();

        let mut index = self.by_gateway_order.write().await;
        let mut map = self.intents.write().await;
        if map.contains_key(&intent_id) || index.contains_key(&gateway_order_id) {
            return Err(EngineError::Internal(format!(
                "intent {intent_id} already exists"
            )));
        }
        index.insert(gateway_order_id, intent_id);
        map.insert(intent_id, Arc::new(RwLock::new(intent)));
        Ok(intent_id)
    }

    /// Returns the intent entry behind its per-intent lock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IntentNotFound`] if no intent with the given
    /// id exists.
    pub async fn get(
        &self,
        intent_id: IntentId,
    ) -> Result<Arc<RwLock<PaymentIntent>>, EngineError> {
        let map = self.intents.read().await;
        map.get(&intent_id)
            .cloned()
            .ok_or_else(|| EngineError::IntentNotFound(intent_id.to_string()))
    }

    /// Looks an intent up by its gateway-facing order id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IntentNotFound`] if the order id is unknown.
    pub async fn get_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Arc<RwLock<PaymentIntent>>, EngineError> {
        let intent_id = {
            let index = self.by_gateway_order.read().await;
            index
                .get(gateway_order_id)
                .copied()
                .ok_or_else(|| EngineError::IntentNotFound(gateway_order_id.to_string()))?
        };
        self.get(intent_id).await
    }

    /// Returns the number of intents in the store.
    pub async fn len(&self) -> usize {
        self.intents.read().await.len()
    }

    /// Returns `true` if the store contains no intents.
    pub async fn is_empty(&self) -> bool {
        self.intents.read().await.is_empty()
    }
}

impl Default for IntentStore {
    fn default() -> Self {
        Self::new()
    }
}
