// # zonesync-core
//
// Core library for keeping an internal DNS zone's A-records in sync with a
// host inventory.
//
// ## Architecture Overview
//
// - **model**: Targets, observed records and the create/delete operations
// - **reconcile**: Pure diff of desired (inventory) against observed (zone) state
// - **InventorySource**: Trait for fetching the current host inventory
// - **DnsProvider**: Trait for listing zone records and submitting batches
// - **SyncEngine**: Thin orchestrator composing fetch → reconcile → apply
//
// ## Design Principles
//
// 1. **Pure core**: `reconcile` performs no I/O and never fails
// 2. **Stateless runs**: every run re-derives state from two fresh snapshots
// 3. **One round trip**: creates and deletes are applied as a single batch
// 4. **Library-first**: the daemon is a thin layer over this crate

pub mod model;
pub mod reconcile;
pub mod traits;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use model::{BatchOutcome, BatchRequest, CreateOp, DeleteOp, ObservedRecord, Target};
pub use reconcile::{Anomaly, Change, Changeset, reconcile};
pub use traits::{DnsProvider, InventorySource};
pub use engine::{SyncEngine, SyncEvent, SyncReport, Trigger};
pub use config::{EngineConfig, InventoryConfig, ProviderConfig, SyncConfig};
pub use error::{Error, Result};
