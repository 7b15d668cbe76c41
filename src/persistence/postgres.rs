//! PostgreSQL implementation of the persistence layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{ContestRow, IntentSnapshot, InventoryRow, StoredPaymentEvent};
use crate::error::EngineError;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an event to the payment event log.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn save_event(
        &self,
        intent_id: Uuid,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, EngineError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO payment_events (intent_id, event_type, payload) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(intent_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Upserts the durable snapshot of one payment intent.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn save_intent_snapshot(
        &self,
        snapshot: &IntentSnapshot,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO payment_intents \
             (intent_id, gateway_order_id, contest_id, status, outcome_allowed, outcome_recorded, outcome, snapshot_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (intent_id) DO UPDATE SET \
             status = EXCLUDED.status, \
             outcome_allowed = EXCLUDED.outcome_allowed, \
             outcome_recorded = EXCLUDED.outcome_recorded, \
             outcome = EXCLUDED.outcome, \
             snapshot_at = EXCLUDED.snapshot_at",
        )
        .bind(snapshot.intent_id)
        .bind(&snapshot.gateway_order_id)
        .bind(snapshot.contest_id)
        .bind(&snapshot.status)
        .bind(snapshot.outcome_allowed)
        .bind(snapshot.outcome_recorded)
        .bind(snapshot.outcome)
        .bind(snapshot.snapshot_at)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    /// Loads events after the given timestamp, optionally filtered by
    /// intent ID.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn load_events_after(
        &self,
        after: DateTime<Utc>,
        intent_id: Option<Uuid>,
    ) -> Result<Vec<StoredPaymentEvent>, EngineError> {
        let rows = if let Some(id) = intent_id {
            sqlx::query_as::<_, (i64, Uuid, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, intent_id, event_type, payload, created_at FROM payment_events \
                 WHERE created_at > $1 AND intent_id = $2 ORDER BY created_at ASC",
            )
            .bind(after)
            .bind(id)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, (i64, Uuid, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, intent_id, event_type, payload, created_at FROM payment_events \
                 WHERE created_at > $1 ORDER BY created_at ASC",
            )
            .bind(after)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, intent_id, event_type, payload, created_at)| StoredPaymentEvent {
                    id,
                    intent_id,
                    event_type,
                    payload,
                    created_at,
                },
            )
            .collect())
    }

    /// Loads all contest rows written by the catalog service.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn load_contests(&self) -> Result<Vec<ContestRow>, EngineError> {
        let rows = sqlx::query_as::<_, (Uuid, String, i64, String, i32, i32, i32, bool)>(
            "SELECT contest_id, name, price_amount, currency, wheel_min, wheel_max, \
             products_per_box, active FROM contests",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    contest_id,
                    name,
                    price_amount,
                    currency,
                    wheel_min,
                    wheel_max,
                    products_per_box,
                    active,
                )| ContestRow {
                    contest_id,
                    name,
                    price_amount,
                    currency,
                    wheel_min,
                    wheel_max,
                    products_per_box,
                    active,
                },
            )
            .collect())
    }

    /// Loads all inventory rows written by the catalog service.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn load_inventory(&self) -> Result<Vec<InventoryRow>, EngineError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, i16, bool, i32)>(
            "SELECT item_id, contest_id, name, rarity_tier, active, stock FROM inventory_items",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(item_id, contest_id, name, rarity_tier, active, stock)| InventoryRow {
                    item_id,
                    contest_id,
                    name,
                    rarity_tier,
                    active,
                    stock,
                },
            )
            .collect())
    }
}
