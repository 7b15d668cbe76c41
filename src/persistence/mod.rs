//! Persistence layer: PostgreSQL event log, intent snapshots, and catalog
//! loading.
//!
//! The in-process stores are authoritative at runtime; PostgreSQL is the
//! durable record. The event log realizes the append-only status history
//! for every intent, and the catalog tables are read at startup (they are
//! written by the external admin subsystem).

pub mod models;
pub mod postgres;
