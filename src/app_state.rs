//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{ReconciliationEngine, RewardAllocator, SpinLedger};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Order creation plus both payment reconciliation paths.
    pub reconciliation: Arc<ReconciliationEngine>,
    /// Write-once spin outcome gate.
    pub spin_ledger: Arc<SpinLedger>,
    /// Inventory allocation.
    pub allocator: Arc<RewardAllocator>,
    /// Event bus for the persistence event log.
    pub event_bus: EventBus,
}
