//! Read-only contest configuration and inventory with atomic stock counters.
//!
//! Contests and inventory rows are owned by the catalog subsystem (admin
//! CRUD lives elsewhere); this engine loads them at startup and only ever
//! mutates one thing: an item's remaining stock, through a single atomic
//! conditional decrement. Each counter is an independently addressable
//! [`AtomicU32`], so allocations for unrelated payments never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::EngineError;

/// Inclusive integer bounds of a contest's wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct WheelRange {
    /// Smallest box count the wheel can land on.
    pub min: u32,
    /// Largest box count the wheel can land on.
    pub max: u32,
}

impl WheelRange {
    /// Creates a range, validating `min <= max`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] when the bounds are inverted.
    pub fn new(min: u32, max: u32) -> Result<Self, EngineError> {
        if min > max {
            return Err(EngineError::InvalidRequest(format!(
                "wheel range [{min}, {max}] has min > max"
            )));
        }
        Ok(Self { min, max })
    }

    /// Whether `value` lies inside the inclusive range.
    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One spin-wheel contest, as configured by the catalog subsystem.
#[derive(Debug, Clone)]
pub struct Contest {
    /// Contest identifier.
    pub contest_id: Uuid,
    /// Display name.
    pub name: String,
    /// Entry fee in minor currency units.
    pub price_amount: i64,
    /// ISO-4217 currency code of the entry fee.
    pub currency: String,
    /// Inclusive box-count bounds of the wheel.
    pub wheel_range: WheelRange,
    /// Items placed in every non-empty box.
    pub products_per_box: u32,
    /// Whether the contest is accepting entries.
    pub active: bool,
}

/// A product unit belonging to exactly one contest.
///
/// `stock` is the only field this engine mutates, and only through
/// [`InventoryItem::decrement_if_available`].
#[derive(Debug)]
pub struct InventoryItem {
    /// Item identifier.
    pub item_id: Uuid,
    /// Contest this item belongs to.
    pub contest_id: Uuid,
    /// Display name, snapshotted into reward assignments.
    pub name: String,
    /// Rarity tier (ordinal; 0 is the most common).
    pub rarity_tier: u8,
    /// Whether the item is eligible for allocation.
    pub active: bool,
    stock: AtomicU32,
}

impl InventoryItem {
    /// Creates an item with the given starting stock.
    #[must_use]
    pub fn new(
        item_id: Uuid,
        contest_id: Uuid,
        name: String,
        rarity_tier: u8,
        active: bool,
        stock: u32,
    ) -> Self {
        Self {
            item_id,
            contest_id,
            name,
            rarity_tier,
            active,
            stock: AtomicU32::new(stock),
        }
    }

    /// Current remaining stock.
    #[must_use]
    pub fn stock(&self) -> u32 {
        self.stock.load(Ordering::Acquire)
    }

    /// Atomically decrements stock iff it is positive.
    ///
    /// Returns `true` when this caller took a unit. Compare-and-set rather
    /// than a blind decrement: with `n` units and any number of concurrent
    /// callers, exactly `n` of them succeed.
    pub fn decrement_if_available(&self) -> bool {
        self.stock
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            })
            .is_ok()
    }
}

/// In-process view of the catalog: contests plus their inventory pools.
///
/// Loaded from the database at startup; the catalog subsystem owns the rows.
#[derive(Debug)]
pub struct Catalog {
    contests: RwLock<HashMap<Uuid, Contest>>,
    items: RwLock<HashMap<Uuid, Arc<InventoryItem>>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            contests: RwLock::new(HashMap::new()),
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a contest.
    pub async fn insert_contest(&self, contest: Contest) {
        let mut map = self.contests.write().await;
        map.insert(contest.contest_id, contest);
    }

    /// Registers an inventory item.
    pub async fn insert_item(&self, item: InventoryItem) {
        let mut map = self.items.write().await;
        map.insert(item.item_id, Arc::new(item));
    }

    /// Returns the contest iff it exists and is active.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContestUnavailable`] for absent or inactive
    /// contests.
    pub async fn active_contest(&self, contest_id: Uuid) -> Result<Contest, EngineError> {
        let map = self.contests.read().await;
        match map.get(&contest_id) {
            Some(contest) if contest.active => Ok(contest.clone()),
            _ => Err(EngineError::ContestUnavailable(contest_id)),
        }
    }

    /// Looks a contest up regardless of its active flag.
    ///
    /// Entries paid before a contest was deactivated still spin and
    /// allocate; only order creation requires [`Catalog::active_contest`].
    pub async fn contest(&self, contest_id: Uuid) -> Option<Contest> {
        self.contests.read().await.get(&contest_id).cloned()
    }

    /// Returns the contest's active, in-stock inventory pool.
    pub async fn pool(&self, contest_id: Uuid) -> Vec<Arc<InventoryItem>> {
        let map = self.items.read().await;
        map.values()
            .filter(|item| item.contest_id == contest_id && item.active && item.stock() > 0)
            .cloned()
            .collect()
    }

    /// Looks up a single item.
    pub async fn item(&self, item_id: Uuid) -> Option<Arc<InventoryItem>> {
        self.items.read().await.get(&item_id).cloned()
    }

    /// Number of registered contests.
    pub async fn contest_count(&self) -> usize {
        self.contests.read().await.len()
    }

    /// Number of registered inventory items.
    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_contest(active: bool) -> Contest {
        let Ok(range) = WheelRange::new(0, 5) else {
            panic!("valid range");
        };
        Contest {
            contest_id: Uuid::new_v4(),
            name: "Launch Week".to_string(),
            price_amount: 100,
            currency: "INR".to_string(),
            wheel_range: range,
            products_per_box: 1,
            active,
        }
    }

    #[test]
    fn wheel_range_rejects_inverted_bounds() {
        assert!(WheelRange::new(5, 0).is_err());
    }

    #[test]
    fn wheel_range_bounds_are_inclusive() {
        let Ok(range) = WheelRange::new(1, 4) else {
            panic!("valid range");
        };
        assert!(!range.contains(0));
        assert!(range.contains(1));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[tokio::test]
    async fn inactive_contest_is_unavailable() {
        let catalog = Catalog::new();
        let contest = make_contest(false);
        let id = contest.contest_id;
        catalog.insert_contest(contest).await;

        let result = catalog.active_contest(id).await;
        assert!(matches!(result, Err(EngineError::ContestUnavailable(_))));
    }

    #[tokio::test]
    async fn missing_contest_is_unavailable() {
        let catalog = Catalog::new();
        let result = catalog.active_contest(Uuid::new_v4()).await;
        assert!(matches!(result, Err(EngineError::ContestUnavailable(_))));
    }

    #[tokio::test]
    async fn pool_filters_inactive_and_out_of_stock() {
        let catalog = Catalog::new();
        let contest_id = Uuid::new_v4();
        catalog
            .insert_item(InventoryItem::new(
                Uuid::new_v4(),
                contest_id,
                "In stock".to_string(),
                0,
                true,
                3,
            ))
            .await;
        catalog
            .insert_item(InventoryItem::new(
                Uuid::new_v4(),
                contest_id,
                "Sold out".to_string(),
                0,
                true,
                0,
            ))
            .await;
        catalog
            .insert_item(InventoryItem::new(
                Uuid::new_v4(),
                contest_id,
                "Retired".to_string(),
                0,
                false,
                5,
            ))
            .await;
        catalog
            .insert_item(InventoryItem::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "Other contest".to_string(),
                0,
                true,
                5,
            ))
            .await;

        let pool = catalog.pool(contest_id).await;
        assert_eq!(pool.len(), 1);
        let Some(item) = pool.first() else {
            panic!("pool should have one item");
        };
        assert_eq!(item.name, "In stock");
    }

    #[test]
    fn decrement_stops_at_zero() {
        let item = InventoryItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Limited".to_string(),
            0,
            true,
            2,
        );
        assert!(item.decrement_if_available());
        assert!(item.decrement_if_available());
        assert!(!item.decrement_if_available());
        assert_eq!(item.stock(), 0);
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        let item = Arc::new(InventoryItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Contended".to_string(),
            0,
            true,
            5,
        ));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let item = Arc::clone(&item);
            handles.push(tokio::spawn(
                async move { item.decrement_if_available() },
            ));
        }

        let mut successes = 0;
        for handle in handles {
            let Ok(took_unit) = handle.await else {
                panic!("decrement task failed");
            };
            if took_unit {
                successes += 1;
            }
        }
        assert_eq!(successes, 5, "at most `stock` decrements succeed");
        assert_eq!(item.stock(), 0);
    }
}
