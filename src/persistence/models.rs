//! Database models for the event log, intent snapshots, and catalog rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Contest, InventoryItem, WheelRange};
use crate::error::EngineError;

/// A stored event row from the `payment_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPaymentEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// Intent that generated the event.
    pub intent_id: Uuid,
    /// Event type discriminator (e.g. `"status_changed"`).
    pub event_type: String,
    /// JSONB payload with event-specific data.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Durable snapshot of one payment intent, upserted on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSnapshot {
    /// Intent identifier.
    pub intent_id: Uuid,
    /// Gateway-facing order id.
    pub gateway_order_id: String,
    /// Contest being played.
    pub contest_id: Uuid,
    /// Current status name.
    pub status: String,
    /// Whether the intent is spin-eligible.
    pub outcome_allowed: bool,
    /// Whether an outcome has been recorded.
    pub outcome_recorded: bool,
    /// The recorded outcome, if any.
    pub outcome: Option<i32>,
    /// Snapshot timestamp.
    pub snapshot_at: DateTime<Utc>,
}

/// A contest row from the `contests` table, owned by the catalog service.
#[derive(Debug, Clone)]
pub struct ContestRow {
    /// Contest identifier.
    pub contest_id: Uuid,
    /// Display name.
    pub name: String,
    /// Entry fee in minor currency units.
    pub price_amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Inclusive lower wheel bound.
    pub wheel_min: i32,
    /// Inclusive upper wheel bound.
    pub wheel_max: i32,
    /// Items per non-empty box.
    pub products_per_box: i32,
    /// Whether the contest accepts entries.
    pub active: bool,
}

impl ContestRow {
    /// Converts the row into the domain [`Contest`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] for rows with negative or
    /// inverted wheel bounds.
    pub fn into_contest(self) -> Result<Contest, EngineError> {
        let min = u32::try_from(self.wheel_min)
            .map_err(|_| EngineError::InvalidRequest("negative wheel bound".to_string()))?;
        let max = u32::try_from(self.wheel_max)
            .map_err(|_| EngineError::InvalidRequest("negative wheel bound".to_string()))?;
        Ok(Contest {
            contest_id: self.contest_id,
            name: self.name,
            price_amount: self.price_amount,
            currency: self.currency,
            wheel_range: WheelRange::new(min, max)?,
            products_per_box: u32::try_from(self.products_per_box).unwrap_or(0),
            active: self.active,
        })
    }
}

/// An inventory row from the `inventory_items` table.
#[derive(Debug, Clone)]
pub struct InventoryRow {
    /// Item identifier.
    pub item_id: Uuid,
    /// Contest the item belongs to.
    pub contest_id: Uuid,
    /// Display name.
    pub name: String,
    /// Rarity tier.
    pub rarity_tier: i16,
    /// Whether the item is eligible for allocation.
    pub active: bool,
    /// Remaining stock.
    pub stock: i32,
}

impl InventoryRow {
    /// Converts the row into the domain [`InventoryItem`].
    #[must_use]
    pub fn into_item(self) -> InventoryItem {
        InventoryItem::new(
            self.item_id,
            self.contest_id,
            self.name,
            u8::try_from(self.rarity_tier).unwrap_or(u8::MAX),
            self.active,
            u32::try_from(self.stock).unwrap_or(0),
        )
    }
}
