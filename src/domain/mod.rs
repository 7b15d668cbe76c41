//! Domain layer: core types, intent store, catalog, and event system.
//!
//! This module contains the server-side domain model: payment intent
//! identity and lifecycle, the concurrent intent store, the read-only
//! contest catalog with atomic stock counters, the reward assignment
//! output model, and the event bus broadcasting state changes.

pub mod catalog;
pub mod event_bus;
pub mod intent_id;
pub mod intent_store;
pub mod payment_event;
pub mod payment_intent;
pub mod reward;

pub use catalog::{Catalog, Contest, InventoryItem, WheelRange};
pub use event_bus::EventBus;
pub use intent_id::IntentId;
pub use intent_store::IntentStore;
pub use payment_event::{PaymentEvent, ReconciliationSource};
pub use payment_intent::{
    CustomerInfo, GatewayCorrelation, PaymentIntent, PaymentStatus, RecordedOutcome,
    TransitionOutcome,
};
pub use reward::{AssignedItem, RewardAssignment, RewardBox};
