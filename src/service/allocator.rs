//! Reward allocator: turns a recorded outcome into concrete inventory.
//!
//! Draws `outcome × products_per_box` items from the contest's pool,
//! biased toward lower rarity tiers, and claims each one with an atomic
//! conditional stock decrement. Allocation never fails for lack of stock;
//! an exhausted pool short-fills the remaining slots and the customer
//! receives (partially) empty boxes.
//!
//! Per intent the assignment is produced exactly once: concurrent and
//! repeated calls coalesce on a `tokio::sync::OnceCell` and all return the
//! same immutable assignment.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{OnceCell, RwLock};

use crate::domain::{
    AssignedItem, Catalog, EventBus, IntentId, IntentStore, InventoryItem, PaymentEvent,
    RewardAssignment, RewardBox,
};
use crate::error::EngineError;

/// Allocates inventory to the boxes a recorded outcome implies.
#[derive(Debug)]
pub struct RewardAllocator {
    intents: Arc<IntentStore>,
    catalog: Arc<Catalog>,
    event_bus: EventBus,
    rarity_weight_decay: f64,
    assignments: RwLock<HashMap<IntentId, Arc<OnceCell<Arc<RewardAssignment>>>>>,
}

impl RewardAllocator {
    /// Creates a new allocator.
    ///
    /// `rarity_weight_decay` is the geometric factor applied to draw weight
    /// per rarity tier: tier `n` items are drawn with weight `decay^n`.
    #[must_use]
    pub fn new(
        intents: Arc<IntentStore>,
        catalog: Arc<Catalog>,
        event_bus: EventBus,
        rarity_weight_decay: f64,
    ) -> Self {
        Self {
            intents,
            catalog,
            event_bus,
            rarity_weight_decay,
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates (or returns the existing) reward assignment for an intent.
    ///
    /// Idempotent: the first caller builds the assignment and everyone
    /// else, including concurrent racers, gets the same one back. Stock is
    /// decremented once per assigned item, never per call.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IntentNotFound`] for unknown intents,
    /// [`EngineError::NotPaid`] when the payment was never confirmed, and
    /// [`EngineError::InvalidRequest`] when no outcome has been recorded
    /// yet.
    pub async fn allocate(&self, intent_id: IntentId) -> Result<Arc<RewardAssignment>, EngineError> {
        let entry = self.intents.get(intent_id).await?;
        let (contest_id, outcome) = {
            let intent = entry.read().await;
            if !intent.outcome_allowed {
                return Err(EngineError::NotPaid(intent_id.to_string()));
            }
            let Some(outcome) = intent.outcome else {
                return Err(EngineError::InvalidRequest(format!(
                    "no spin outcome recorded for intent {intent_id}"
                )));
            };
            (intent.contest_id, outcome)
        };

        let cell = {
            let mut map = self.assignments.write().await;
            Arc::clone(
                map.entry(intent_id)
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let assignment = cell
            .get_or_try_init(|| self.build(intent_id, contest_id, outcome))
            .await?;
        Ok(Arc::clone(assignment))
    }

    /// Builds the assignment; runs at most once per intent.
    async fn build(
        &self,
        intent_id: IntentId,
        contest_id: uuid::Uuid,
        outcome: u32,
    ) -> Result<Arc<RewardAssignment>, EngineError> {
        let contest = self.catalog.contest(contest_id).await.ok_or_else(|| {
            EngineError::Internal(format!("contest {contest_id} missing for paid intent"))
        })?;

        let per_box = contest.products_per_box as usize;
        let box_count = outcome as usize;
        let target = box_count * per_box;

        let mut boxes: Vec<RewardBox> = (0..box_count).map(|_| RewardBox::default()).collect();
        let mut assigned = 0_usize;

        if target > 0 {
            let mut pool = self.catalog.pool(contest_id).await;
            let mut rng = rand::thread_rng();

            while assigned < target && !pool.is_empty() {
                let idx = weighted_pick(&mut rng, &pool, self.rarity_weight_decay);
                let Some(item) = pool.get(idx).cloned() else {
                    break;
                };
                if item.decrement_if_available() {
                    if let Some(slot) = boxes.get_mut(assigned / per_box) {
                        slot.items.push(AssignedItem {
                            item_id: item.item_id,
                            name: item.name.clone(),
                            rarity_tier: item.rarity_tier,
                        });
                    }
                    assigned += 1;
                    if item.stock() == 0 {
                        pool.swap_remove(idx);
                    }
                } else {
                    // A concurrent allocation took the last unit; redraw
                    // with a different candidate.
                    pool.swap_remove(idx);
                }
            }
        }

        let shortfall = u32::try_from(target - assigned).unwrap_or(u32::MAX);
        let assignment = Arc::new(RewardAssignment {
            intent_id,
            contest_id,
            outcome,
            boxes,
            shortfall,
            allocated_at: Utc::now(),
        });

        let _ = self.event_bus.publish(PaymentEvent::RewardAllocated {
            intent_id,
            boxes: outcome,
            items_assigned: u32::try_from(assigned).unwrap_or(u32::MAX),
            shortfall,
            timestamp: Utc::now(),
        });
        tracing::info!(
            %intent_id,
            boxes = outcome,
            items = assigned,
            shortfall,
            "reward allocated"
        );

        Ok(assignment)
    }
}

/// Picks a pool index with probability proportional to `decay^rarity_tier`.
///
/// Falls back to a uniform pick when the weights degenerate (all zero or
/// non-finite). The caller guarantees a non-empty pool.
fn weighted_pick<R: Rng>(rng: &mut R, pool: &[Arc<InventoryItem>], decay: f64) -> usize {
    let weights: Vec<f64> = pool
        .iter()
        .map(|item| decay.powi(i32::from(item.rarity_tier)))
        .collect();
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return rng.gen_range(0..pool.len());
    }

    let mut roll = rng.gen_range(0.0..total);
    for (idx, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return idx;
        }
        roll -= weight;
    }
    pool.len().saturating_sub(1)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        Contest, CustomerInfo, GatewayCorrelation, PaymentIntent, PaymentStatus, WheelRange,
    };
    use chrono::Duration;

    struct Fixture {
        allocator: Arc<RewardAllocator>,
        intents: Arc<IntentStore>,
        catalog: Arc<Catalog>,
        contest_id: uuid::Uuid,
    }

    async fn make_fixture(products_per_box: u32, decay: f64) -> Fixture {
        let intents = Arc::new(IntentStore::new());
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
                products_per_box,
                active: true,
            })
            .await;
        let allocator = Arc::new(RewardAllocator::new(
            Arc::clone(&intents),
            Arc::clone(&catalog),
            EventBus::new(100),
            decay,
        ));
        Fixture {
            allocator,
            intents,
            catalog,
            contest_id,
        }
    }

    async fn add_item(fixture: &Fixture, name: &str, tier: u8, stock: u32) -> uuid::Uuid {
        let item_id = uuid::Uuid::new_v4();
        fixture
            .catalog
            .insert_item(InventoryItem::new(
                item_id,
                fixture.contest_id,
                name.to_string(),
                tier,
                true,
                stock,
            ))
            .await;
        item_id
    }

    async fn spun_intent(fixture: &Fixture, outcome: u32) -> IntentId {
        let mut intent = PaymentIntent::new(
            fixture.contest_id,
            100,
            "INR".to_string(),
            CustomerInfo {
                name: "Test Customer".to_string(),
                email: "test@example.com".to_string(),
                phone: "+910000000000".to_string(),
            },
            None,
            Duration::minutes(30),
        );
        let Ok(_) = intent.transition(PaymentStatus::Paid, GatewayCorrelation::default()) else {
            panic!("transition failed");
        };
        let Ok(_) = intent.record_outcome(outcome) else {
            panic!("record failed");
        };
        let Ok(id) = fixture.intents.insert(intent).await else {
            panic!("insert failed");
        };
        id
    }

    #[tokio::test]
    async fn zero_outcome_yields_empty_assignment() {
        let fixture = make_fixture(1, 0.5).await;
        let _ = add_item(&fixture, "Sticker", 0, 10).await;
        let id = spun_intent(&fixture, 0).await;

        let Ok(assignment) = fixture.allocator.allocate(id).await else {
            panic!("allocate failed");
        };
        assert!(assignment.boxes.is_empty());
        assert_eq!(assignment.shortfall, 0);
        assert_eq!(assignment.item_count(), 0);
    }

    #[tokio::test]
    async fn allocates_outcome_boxes_and_decrements_stock() {
        let fixture = make_fixture(1, 0.5).await;
        let item_id = add_item(&fixture, "Sticker", 0, 10).await;
        let id = spun_intent(&fixture, 3).await;

        let Ok(assignment) = fixture.allocator.allocate(id).await else {
            panic!("allocate failed");
        };
        assert_eq!(assignment.boxes.len(), 3);
        assert_eq!(assignment.item_count(), 3);
        assert!(assignment.boxes.iter().all(|b| b.items.len() == 1));
        assert_eq!(assignment.shortfall, 0);

        let Some(item) = fixture.catalog.item(item_id).await else {
            panic!("item missing");
        };
        assert_eq!(item.stock(), 7);
    }

    #[tokio::test]
    async fn repeat_allocation_returns_existing_assignment() {
        let fixture = make_fixture(1, 0.5).await;
        let item_id = add_item(&fixture, "Sticker", 0, 10).await;
        let id = spun_intent(&fixture, 2).await;

        let Ok(first) = fixture.allocator.allocate(id).await else {
            panic!("allocate failed");
        };
        let Ok(second) = fixture.allocator.allocate(id).await else {
            panic!("re-allocate failed");
        };
        assert!(Arc::ptr_eq(&first, &second));

        // Stock was decremented once per item, not once per call.
        let Some(item) = fixture.catalog.item(item_id).await else {
            panic!("item missing");
        };
        assert_eq!(item.stock(), 8);
    }

    #[tokio::test]
    async fn pool_exhaustion_short_fills_instead_of_failing() {
        // 3 boxes of 2 against 4 remaining units.
        let fixture = make_fixture(2, 0.5).await;
        let _ = add_item(&fixture, "Pin A", 0, 2).await;
        let _ = add_item(&fixture, "Pin B", 0, 2).await;
        let id = spun_intent(&fixture, 3).await;

        let Ok(assignment) = fixture.allocator.allocate(id).await else {
            panic!("allocate failed");
        };
        assert_eq!(assignment.boxes.len(), 3);
        assert_eq!(assignment.item_count(), 4);
        assert_eq!(assignment.shortfall, 2);
        assert!(
            assignment.boxes.iter().any(|b| b.items.len() < 2),
            "at least one box is short"
        );
    }

    #[tokio::test]
    async fn concurrent_allocations_never_oversell() {
        let fixture = make_fixture(1, 0.5).await;
        let item_id = add_item(&fixture, "Limited", 0, 5).await;

        let mut ids = Vec::new();
        for _ in 0..10 {
            ids.push(spun_intent(&fixture, 1).await);
        }

        let mut handles = Vec::new();
        for id in ids {
            let allocator = Arc::clone(&fixture.allocator);
            handles.push(tokio::spawn(async move { allocator.allocate(id).await }));
        }

        let mut total_items = 0;
        for handle in handles {
            let Ok(Ok(assignment)) = handle.await else {
                panic!("allocation task failed");
            };
            assert_eq!(assignment.boxes.len(), 1, "every intent gets its box");
            total_items += assignment.item_count();
        }

        assert_eq!(total_items, 5, "exactly `stock` units handed out");
        let Some(item) = fixture.catalog.item(item_id).await else {
            panic!("item missing");
        };
        assert_eq!(item.stock(), 0);
    }

    #[tokio::test]
    async fn zero_decay_draws_only_common_tier_while_it_lasts() {
        let fixture = make_fixture(1, 0.0).await;
        let _ = add_item(&fixture, "Common", 0, 3).await;
        let _ = add_item(&fixture, "Rare", 1, 3).await;
        let id = spun_intent(&fixture, 3).await;

        let Ok(assignment) = fixture.allocator.allocate(id).await else {
            panic!("allocate failed");
        };
        assert_eq!(assignment.item_count(), 3);
        for rf_box in &assignment.boxes {
            for item in &rf_box.items {
                assert_eq!(item.rarity_tier, 0, "decay 0 never draws rarer tiers");
            }
        }
    }

    #[tokio::test]
    async fn unpaid_intent_cannot_allocate() {
        let fixture = make_fixture(1, 0.5).await;
        let intent = PaymentIntent::new(
            fixture.contest_id,
            100,
            "INR".to_string(),
            CustomerInfo {
                name: "Test Customer".to_string(),
                email: "test@example.com".to_string(),
                phone: "+910000000000".to_string(),
            },
            None,
            Duration::minutes(30),
        );
        let Ok(id) = fixture.intents.insert(intent).await else {
            panic!("insert failed");
        };

        let result = fixture.allocator.allocate(id).await;
        assert!(matches!(result, Err(EngineError::NotPaid(_))));
    }

    #[tokio::test]
    async fn paid_but_unspun_intent_cannot_allocate() {
        let fixture = make_fixture(1, 0.5).await;
        let mut intent = PaymentIntent::new(
            fixture.contest_id,
            100,
            "INR".to_string(),
            CustomerInfo {
                name: "Test Customer".to_string(),
                email: "test@example.com".to_string(),
                phone: "+910000000000".to_string(),
            },
            None,
            Duration::minutes(30),
        );
        let Ok(_) = intent.transition(PaymentStatus::Paid, GatewayCorrelation::default()) else {
            panic!("transition failed");
        };
        let Ok(id) = fixture.intents.insert(intent).await else {
            panic!("insert failed");
        };

        let result = fixture.allocator.allocate(id).await;
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }
}
