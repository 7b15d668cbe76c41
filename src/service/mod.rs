//! Service layer: reconciliation, spin ledger, and reward allocation.

pub mod allocator;
pub mod reconciliation;
pub mod spin_ledger;

pub use allocator::RewardAllocator;
pub use reconciliation::{OpenedOrder, ReconciliationEngine, VerifiedStatus, WebhookDisposition};
pub use spin_ledger::{SpinLedger, SpinRecord, SpinStatus};
