//! Sync engine
//!
//! The SyncEngine is a thin orchestrator responsible for:
//! - Fetching the inventory snapshot via InventorySource
//! - Fetching the zone snapshot via DnsProvider and keeping managed records
//! - Running the pure reconciler
//! - Submitting the resulting changes as one batch
//!
//! ## Architecture
//!
//! ```text
//!  Trigger (HTTP / schedule)
//!          │
//!          ▼
//!   ┌──────────────┐   targets   ┌────────────────┐
//!   │  SyncEngine  │◄────────────│ InventorySource│
//!   └──────────────┘             └────────────────┘
//!          │   ▲  records
//!          │   └────────────────┐
//!          ▼                    │
//!   ┌──────────────┐     ┌─────────────┐
//!   │  reconcile() │     │ DnsProvider │
//!   └──────────────┘     └─────────────┘
//!          │ changeset          ▲
//!          └───── one batch ────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch targets (failure aborts the run)
//! 2. Fetch zone records, keep A-records under the suffix (failure aborts the run)
//! 3. Reconcile
//! 4. Nothing to change: return without calling the provider
//! 5. Otherwise submit creates and deletes in a single batch
//!
//! No state survives a run. A run that fails leaves the next one to
//! recompute the same diff.

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::{BatchOutcome, BatchRequest, ObservedRecord, managed_records};
use crate::reconcile::{Anomaly, Change, reconcile};
use crate::traits::{DnsProvider, InventorySource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// HTTP request; the caller waits for the result
    OnDemand,
    /// Periodic timer; the outcome is only logged
    Scheduled,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::OnDemand => write!(f, "on-demand"),
            Trigger::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    Started { trigger: Trigger },

    /// Reconciliation produced changes that are about to be submitted
    ChangesPlanned {
        trigger: Trigger,
        creates: usize,
        deletes: usize,
    },

    /// Batch applied
    Applied {
        trigger: Trigger,
        creates: usize,
        deletes: usize,
    },

    /// Zone already matched the inventory; the provider was not called
    NoChanges { trigger: Trigger },

    /// Run failed
    Failed { trigger: Trigger, error: String },

    /// Periodic loop stopped
    Stopped { reason: String },
}

/// Outcome of one successful run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// What started the run
    pub trigger: Trigger,
    /// Changes submitted to the provider (empty for a no-op run)
    pub changes: Vec<Change>,
    /// Input irregularities noticed while reconciling
    pub anomalies: Vec<Anomaly>,
    /// Whether a batch was submitted
    pub applied: bool,
    /// Managed records after the run
    pub records: Vec<ObservedRecord>,
    /// When the run finished
    pub completed_at: DateTime<Utc>,
}

/// Core sync engine
///
/// Composes an [`InventorySource`] and a [`DnsProvider`] around the pure
/// reconciler. Share it behind an `Arc` between the HTTP trigger and the
/// periodic trigger.
///
/// ## Concurrency
///
/// With `serialize_runs` enabled (the default), overlapping runs wait for
/// each other. Without it they proceed independently; both compute the
/// same diff from near-identical snapshots, so the worst case is a
/// duplicate provider call.
pub struct SyncEngine {
    /// Inventory source for desired state
    inventory: Box<dyn InventorySource>,

    /// DNS provider for observed state and changes
    provider: Box<dyn DnsProvider>,

    /// Managed DNS suffix
    suffix: String,

    /// Held for the duration of a run when runs are serialized
    run_lock: Option<Mutex<()>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `inventory`: Inventory source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: zonesync configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        inventory: Box<dyn InventorySource>,
        provider: Box<dyn DnsProvider>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            inventory,
            provider,
            suffix: config.suffix,
            run_lock: config.engine.serialize_runs.then(|| Mutex::new(())),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: the zone matches the inventory snapshot (or
    ///   already did, in which case `applied` is false)
    /// - `Err(Error)`: a fetch or the batch failed; nothing was partially applied
    pub async fn run_once(&self, trigger: Trigger) -> Result<SyncReport> {
        let _guard = match &self.run_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        self.emit_event(SyncEvent::Started { trigger });
        debug!("Starting {} sync for suffix {}", trigger, self.suffix);

        let result = self.sync(trigger).await;
        if let Err(e) = &result {
            error!("{} sync failed: {}", trigger, e);
            self.emit_event(SyncEvent::Failed {
                trigger,
                error: e.to_string(),
            });
        }

        result
    }

    /// Run reconciliations periodically until `shutdown` resolves
    ///
    /// The first run starts immediately. Failed runs are logged and the loop
    /// keeps going; the next tick retries from fresh snapshots.
    ///
    /// # Parameters
    ///
    /// - `interval`: Time between the start of two runs
    /// - `shutdown`: Future that resolves when the loop should stop
    pub async fn run_scheduled<F>(&self, interval: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        if interval.is_zero() {
            return Err(Error::config("Sync interval must be > 0"));
        }

        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(timer);

        tokio::pin!(shutdown);

        info!("Periodic sync every {:?}", interval);

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    // Failures are already logged by run_once; keep going
                    if let Ok(report) = self.run_once(Trigger::Scheduled).await {
                        info!(
                            "Scheduled sync complete: {} change(s), {} record(s)",
                            report.changes.len(),
                            report.records.len()
                        );
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping periodic sync");
                    self.emit_event(SyncEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    async fn sync(&self, trigger: Trigger) -> Result<SyncReport> {
        let targets = self
            .inventory
            .targets()
            .await
            .map_err(|e| Error::fetch("inventory", e.to_string()))?;

        let listed = self
            .provider
            .list_records()
            .await
            .map_err(|e| Error::fetch("zone", e.to_string()))?;
        let records = managed_records(listed, &self.suffix);

        debug!(
            "Fetched {} target(s) from {} and {} managed record(s) from {}",
            targets.len(),
            self.inventory.source_name(),
            records.len(),
            self.provider.provider_name()
        );

        let changeset = reconcile(&targets, &records, &self.suffix);

        for anomaly in &changeset.anomalies {
            log_anomaly(anomaly);
        }

        if changeset.is_empty() {
            info!("Zone in sync: {} record(s) under {}", records.len(), self.suffix);
            self.emit_event(SyncEvent::NoChanges { trigger });
            return Ok(SyncReport {
                trigger,
                changes: Vec::new(),
                anomalies: changeset.anomalies,
                applied: false,
                records,
                completed_at: Utc::now(),
            });
        }

        for change in &changeset.changes {
            log_change(change);
        }

        let batch = changeset.to_batch();
        self.emit_event(SyncEvent::ChangesPlanned {
            trigger,
            creates: batch.posts.len(),
            deletes: batch.deletes.len(),
        });

        let outcome = self
            .provider
            .apply_batch(&batch)
            .await
            .map_err(|e| Error::apply(e.to_string()))?;
        verify_outcome(&batch, &outcome)?;

        info!(
            "Applied batch via {}: {} create(s), {} delete(s)",
            self.provider.provider_name(),
            batch.posts.len(),
            batch.deletes.len()
        );
        self.emit_event(SyncEvent::Applied {
            trigger,
            creates: batch.posts.len(),
            deletes: batch.deletes.len(),
        });

        Ok(SyncReport {
            trigger,
            changes: changeset.changes,
            anomalies: changeset.anomalies,
            applied: true,
            records: post_sync_records(records, outcome, &self.suffix),
            completed_at: Utc::now(),
        })
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Treat any shortfall in the provider's report as a failed batch
fn verify_outcome(batch: &BatchRequest, outcome: &BatchOutcome) -> Result<()> {
    if outcome.created.len() != batch.posts.len() {
        return Err(Error::apply(format!(
            "provider reported {} of {} create(s)",
            outcome.created.len(),
            batch.posts.len()
        )));
    }

    let missing: Vec<&str> = batch
        .deletes
        .iter()
        .filter(|d| !outcome.deleted.contains(&d.id))
        .map(|d| d.id.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(Error::apply(format!(
            "provider did not confirm deletion of {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Project the zone snapshot through an applied batch
fn post_sync_records(
    mut records: Vec<ObservedRecord>,
    outcome: BatchOutcome,
    suffix: &str,
) -> Vec<ObservedRecord> {
    records.retain(|r| !outcome.deleted.contains(&r.id));
    records.extend(managed_records(outcome.created, suffix));
    records
}

fn log_change(change: &Change) {
    match change {
        Change::Create { name, content } => info!("Creating {} -> {}", name, content),
        Change::Replace {
            name,
            previous,
            content,
        } => info!("Replacing {} -> {} (was: {})", name, content, previous),
        Change::Delete { name, content } => info!("Deleting stale {} (was: {})", name, content),
    }
}

fn log_anomaly(anomaly: &Anomaly) {
    match anomaly {
        Anomaly::IncompleteTarget { hostname } => debug!(
            "Skipping target without hostname or address: {}",
            hostname.as_deref().unwrap_or("<none>")
        ),
        Anomaly::DuplicateHostname {
            name,
            discarded,
            kept,
        } => warn!(
            "Duplicate hostname in inventory for {}: keeping {}, discarding {}",
            name, kept, discarded
        ),
        Anomaly::DuplicateRecord {
            name,
            discarded_id,
            kept_id,
        } => warn!(
            "Zone has several records named {}: using {}, ignoring {}",
            name, kept_id, discarded_id
        ),
    }
}
