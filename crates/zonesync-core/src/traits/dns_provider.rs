// # DNS Provider Trait
//
// Defines the interface for reading a zone and submitting change batches via
// a provider API.
//
// ## Implementations
//
// - Cloudflare: `zonesync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::{DnsProvider, BatchRequest, CreateOp};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records().await?;
//
//     let batch = BatchRequest::new(
//         vec![CreateOp::new("db1.internal.example", "10.0.0.5")],
//         vec![],
//     );
//     provider.apply_batch(&batch).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::{BatchOutcome, BatchRequest, ObservedRecord};

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks: an
/// on-demand run may overlap a scheduled one.
///
/// ## Allowed
/// - HTTP/HTTPS API calls to the provider's own endpoints
/// - Parsing provider-specific responses
///
/// ## Not Allowed
/// - Retry or backoff (the next run recomputes and retries the same diff)
/// - Deciding what to change (owned by `reconcile`)
/// - Splitting a batch into several calls: `apply_batch` is one round trip
/// - Caching records between calls
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every A-record in the zone
    ///
    /// The result may include records outside the managed suffix; the engine
    /// filters them out before reconciling.
    async fn list_records(&self) -> Result<Vec<ObservedRecord>, crate::Error>;

    /// Submit creates and deletes together in a single request
    ///
    /// # Returns
    ///
    /// - `Ok(BatchOutcome)`: every operation in the batch was applied
    /// - `Err(Error)`: the batch was rejected; the zone is unchanged
    ///
    /// A provider that reports a partial failure must return an error.
    async fn apply_batch(&self, batch: &BatchRequest) -> Result<BatchOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
