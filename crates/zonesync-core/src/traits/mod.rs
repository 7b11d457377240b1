//! Core traits for the zonesync system
//!
//! This module defines the abstract interfaces of the network-facing
//! collaborators. The engine composes them explicitly; neither knows about
//! the other.
//!
//! - [`InventorySource`]: Fetch the current host inventory
//! - [`DnsProvider`]: List zone records and apply change batches

pub mod inventory_source;
pub mod dns_provider;

pub use inventory_source::InventorySource;
pub use dns_provider::DnsProvider;
