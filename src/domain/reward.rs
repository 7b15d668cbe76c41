//! Reward assignment output model.
//!
//! A [`RewardAssignment`] is produced exactly once per paid intent and never
//! mutated afterwards; the downstream order/cart subsystem consumes it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::IntentId;

/// Snapshot of an inventory item placed into a box.
///
/// A snapshot rather than a live reference: later catalog edits must not
/// change what a customer was awarded.
#[derive(Debug, Clone, Serialize)]
pub struct AssignedItem {
    /// Inventory item identifier.
    pub item_id: Uuid,
    /// Item name at allocation time.
    pub name: String,
    /// Rarity tier at allocation time.
    pub rarity_tier: u8,
}

/// One mystery box: zero or more assigned items.
///
/// An empty box is a legitimate outcome: either the wheel landed on zero
/// or the inventory pool ran dry mid-allocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewardBox {
    /// Items placed in this box, in draw order.
    pub items: Vec<AssignedItem>,
}

impl RewardBox {
    /// Whether the box received no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The output of one allocation: an ordered list of boxes.
#[derive(Debug, Clone, Serialize)]
pub struct RewardAssignment {
    /// Intent this assignment fulfils.
    pub intent_id: IntentId,
    /// Contest the items were drawn from.
    pub contest_id: Uuid,
    /// The recorded spin outcome (box count).
    pub outcome: u32,
    /// The boxes, in wheel order.
    pub boxes: Vec<RewardBox>,
    /// Item slots left unfilled because the pool was exhausted.
    pub shortfall: u32,
    /// Allocation timestamp.
    pub allocated_at: DateTime<Utc>,
}

impl RewardAssignment {
    /// Total items assigned across all boxes.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.boxes.iter().map(|b| b.items.len()).sum()
    }
}
