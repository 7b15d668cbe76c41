//! # lootwheel-engine
//!
//! Payment-gated spin-reward engine for the lootwheel mystery-box storefront.
//!
//! A customer pays a fixed entry fee to spin a randomized wheel that decides
//! how many mystery boxes of physical merchandise they receive. This crate is
//! the correctness core of that flow: it opens the monetary transaction with
//! the external payment gateway, reconciles the transaction outcome through
//! two racing channels (client polling and the gateway's signed webhook),
//! guarantees a paid entry yields exactly one recorded outcome, and allocates
//! physical inventory to the resulting boxes without overselling stock.
//!
//! Catalog CRUD, authentication, cart, and wheel rendering live in other
//! services; this engine only consumes their data.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)                 Payment Gateway
//!     │                               │
//!     ├── REST Handlers (api/)  ◄──── webhook push
//!     │
//!     ├── ReconciliationEngine (service/)
//!     ├── SpinLedger (service/)
//!     ├── RewardAllocator (service/)
//!     │
//!     ├── IntentStore + Catalog (domain/)
//!     ├── EventBus (domain/)
//!     │
//!     └── PostgreSQL Persistence
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod service;
