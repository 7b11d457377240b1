// # Inventory Source Trait
//
// Defines the interface for fetching the set of hosts that should resolve
// under the managed suffix.
//
// ## Implementations
//
// - HTTP devices API: `zonesync-inventory-http` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::InventorySource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* InventorySource implementation */;
//
//     for target in source.targets().await? {
//         println!("{:?} -> {:?}", target.hostname, target.ipv4);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::Target;

/// Trait for inventory source implementations
///
/// # Contract
///
/// - One call returns one complete snapshot of the inventory
/// - Entries may lack a hostname or an IPv4 address; the reconciler skips them
/// - Any transport or decoding failure is returned as an error and aborts the run
/// - No retries, caching or background tasks: every run asks again
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch the current list of targets
    async fn targets(&self) -> Result<Vec<Target>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
