//! Test doubles and common utilities for engine contract tests
//!
//! The doubles are in-memory stand-ins for the network-facing collaborators:
//! an inventory that returns a fixed list and a zone that applies batches the
//! way an all-or-nothing provider would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zonesync_core::config::{EngineConfig, InventoryConfig, ProviderConfig, SyncConfig};
use zonesync_core::error::Result;
use zonesync_core::{
    BatchOutcome, BatchRequest, DnsProvider, Error, InventorySource, ObservedRecord, Target,
};

pub const SUFFIX: &str = "internal.example";

/// Inventory source returning a shared, mutable list of targets
#[derive(Clone, Default)]
pub struct StaticInventory {
    targets: Arc<Mutex<Vec<Target>>>,
    calls: Arc<AtomicUsize>,
    fail: Arc<Mutex<Option<String>>>,
}

impl StaticInventory {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets: Arc::new(Mutex::new(targets)),
            ..Self::default()
        }
    }

    /// Replace the inventory seen by subsequent runs
    pub fn set_targets(&self, targets: Vec<Target>) {
        *self.targets.lock().unwrap() = targets;
    }

    /// Make subsequent calls fail with `message`
    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InventorySource for StaticInventory {
    async fn targets(&self) -> Result<Vec<Target>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail.lock().unwrap().clone() {
            return Err(Error::inventory(message));
        }
        Ok(self.targets.lock().unwrap().clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// How the in-memory zone answers `apply_batch`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// Apply every operation and report all of them
    Apply,
    /// Reject the batch without touching the zone
    Reject,
    /// Apply nothing but report success with an empty result
    ReportNothing,
}

/// DNS provider backed by an in-memory zone
#[derive(Clone)]
pub struct InMemoryZone {
    records: Arc<Mutex<Vec<ObservedRecord>>>,
    batches: Arc<Mutex<Vec<BatchRequest>>>,
    list_calls: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
    mode: Arc<Mutex<ApplyMode>>,
    list_failure: Arc<Mutex<Option<String>>>,
    apply_delay: Duration,
}

impl InMemoryZone {
    pub fn new(records: Vec<ObservedRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            batches: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicUsize::new(1)),
            mode: Arc::new(Mutex::new(ApplyMode::Apply)),
            list_failure: Arc::new(Mutex::new(None)),
            apply_delay: Duration::ZERO,
        }
    }

    /// Hold every batch for `delay` before applying it
    pub fn with_apply_delay(mut self, delay: Duration) -> Self {
        self.apply_delay = delay;
        self
    }

    pub fn set_mode(&self, mode: ApplyMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn fail_listing_with(&self, message: &str) {
        *self.list_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn records(&self) -> Vec<ObservedRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Record names and contents, sorted, for order-insensitive assertions
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .records()
            .into_iter()
            .map(|r| (r.name, r.content))
            .collect();
        entries.sort();
        entries
    }

    pub fn batches(&self) -> Vec<BatchRequest> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProvider for InMemoryZone {
    async fn list_records(&self) -> Result<Vec<ObservedRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.list_failure.lock().unwrap().clone() {
            return Err(Error::provider("memory", message));
        }
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.record_type == "A")
            .collect())
    }

    async fn apply_batch(&self, batch: &BatchRequest) -> Result<BatchOutcome> {
        if !self.apply_delay.is_zero() {
            tokio::time::sleep(self.apply_delay).await;
        }

        self.batches.lock().unwrap().push(batch.clone());

        let mode = *self.mode.lock().unwrap();
        match mode {
            ApplyMode::Reject => return Err(Error::provider("memory", "batch rejected")),
            ApplyMode::ReportNothing => return Ok(BatchOutcome::default()),
            ApplyMode::Apply => {}
        }

        let mut records = self.records.lock().unwrap();

        // Like real providers, refuse an identical record; the batch is atomic
        for post in &batch.posts {
            let identical = records.iter().any(|r| {
                r.name == post.name
                    && r.content == post.content
                    && !batch.deletes.iter().any(|d| d.id == r.id)
            });
            if identical {
                return Err(Error::provider(
                    "memory",
                    format!("identical record already exists: {}", post.name),
                ));
            }
        }

        let mut outcome = BatchOutcome::default();

        for delete in &batch.deletes {
            records.retain(|r| r.id != delete.id);
            outcome.deleted.push(delete.id.clone());
        }
        for post in &batch.posts {
            let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let mut record = ObservedRecord::a(id, post.name.clone(), post.content.clone());
            record.ttl = Some(post.ttl);
            record.proxied = Some(post.proxied);
            records.push(record.clone());
            outcome.created.push(record);
        }

        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig {
        suffix: SUFFIX.to_string(),
        inventory: InventoryConfig::Http {
            base_url: "https://inventory.test".to_string(),
            account: "test-account".to_string(),
            api_key: "test-key".to_string(),
        },
        provider: ProviderConfig::Cloudflare {
            api_token: "test-token".to_string(),
            zone_id: Some("test-zone".to_string()),
            account_id: None,
        },
        engine: EngineConfig::default(),
    }
}
