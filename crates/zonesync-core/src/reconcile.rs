//! Reconciliation of desired inventory state against observed zone state
//!
//! [`reconcile`] is a pure function: it performs no I/O, never fails, and
//! returns the same [`Changeset`] for the same input. Logging is left to the
//! caller, which can derive it from [`Changeset::changes`] and
//! [`Changeset::anomalies`].
//!
//! ## Algorithm
//!
//! ```text
//! targets ──► desired: name → ip        (last hostname wins)
//! records ──► observed: name → (id, ip) (last record wins)
//!
//! for (name, ip) in desired:
//!     observed[name] == ip  → nothing
//!     observed[name] != ip  → delete old id + create (name, ip)
//!     no observed[name]     → create (name, ip)
//!     remove name from observed
//!
//! for leftover in observed  → delete (stale)
//! ```
//!
//! A changed address is never an in-place update: it is always one delete
//! plus one create, so the whole diff fits in a single batch request.

use crate::model::{BatchRequest, CreateOp, DeleteOp, ObservedRecord, Target, qualified_name};
use serde::Serialize;
use std::collections::HashMap;

/// Structured description of one change, for logs and events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Change {
    /// A new record for a target that had none
    Create { name: String, content: String },
    /// An existing record whose address changed (delete + create)
    Replace {
        name: String,
        previous: String,
        content: String,
    },
    /// A record with no corresponding target
    Delete { name: String, content: String },
}

/// Non-fatal input irregularity noticed while reconciling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// A target without hostname or address, treated as not yet provisioned
    IncompleteTarget { hostname: Option<String> },
    /// Two targets mapped to the same record name; the later one was kept
    DuplicateHostname {
        name: String,
        discarded: String,
        kept: String,
    },
    /// The zone reported two records with the same name; the later one was kept
    /// and the discarded record is left in place
    DuplicateRecord {
        name: String,
        discarded_id: String,
        kept_id: String,
    },
}

/// Result of a reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    /// Records to create, in desired-mapping order
    pub creates: Vec<CreateOp>,
    /// Records to delete: replaced records first, then stale ones
    pub deletes: Vec<DeleteOp>,
    /// Per-name description of what the creates and deletes accomplish
    pub changes: Vec<Change>,
    /// Irregularities in the input that did not prevent reconciliation
    pub anomalies: Vec<Anomaly>,
}

impl Changeset {
    /// True when the zone already matches the inventory
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.deletes.is_empty()
    }

    /// Build the single batch request carrying every operation
    pub fn to_batch(&self) -> BatchRequest {
        BatchRequest::new(self.creates.clone(), self.deletes.clone())
    }
}

/// Insertion-ordered map where re-inserting a key replaces its value in place
struct OrderedMap<V> {
    entries: Vec<Option<(String, V)>>,
    index: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or replace, returning the replaced value
    fn insert(&mut self, key: String, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot]
                .as_mut()
                .map(|(_, existing)| std::mem::replace(existing, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(Some((key, value)));
                None
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.index.remove(key)?;
        self.entries[slot].take().map(|(_, value)| value)
    }

    fn into_entries(self) -> impl Iterator<Item = (String, V)> {
        self.entries.into_iter().flatten()
    }
}

struct Observed {
    id: String,
    content: String,
}

/// Compute the creates and deletes that bring the zone in line with `targets`
///
/// # Parameters
///
/// - `targets`: Inventory snapshot; incomplete entries are skipped
/// - `existing`: Zone snapshot, already restricted to A-records under `suffix`
/// - `suffix`: Managed DNS suffix, without leading dot
///
/// # Returns
///
/// A [`Changeset`] whose creates and deletes, applied together, make the
/// record names under `suffix` equal to the target names with equal content.
/// Re-running on a converged zone returns an empty changeset.
pub fn reconcile(targets: &[Target], existing: &[ObservedRecord], suffix: &str) -> Changeset {
    let mut changeset = Changeset::default();

    let mut desired: OrderedMap<String> = OrderedMap::new();
    for target in targets {
        let Some((hostname, ipv4)) = target.parts() else {
            changeset.anomalies.push(Anomaly::IncompleteTarget {
                hostname: target.hostname.clone(),
            });
            continue;
        };

        let name = qualified_name(hostname, suffix);
        if let Some(discarded) = desired.insert(name.clone(), ipv4.to_string()) {
            changeset.anomalies.push(Anomaly::DuplicateHostname {
                name,
                discarded,
                kept: ipv4.to_string(),
            });
        }
    }

    let mut observed: OrderedMap<Observed> = OrderedMap::new();
    for record in existing {
        let entry = Observed {
            id: record.id.clone(),
            content: record.content.clone(),
        };
        if let Some(discarded) = observed.insert(record.name.clone(), entry) {
            changeset.anomalies.push(Anomaly::DuplicateRecord {
                name: record.name.clone(),
                discarded_id: discarded.id,
                kept_id: record.id.clone(),
            });
        }
    }

    for (name, ip) in desired.into_entries() {
        match observed.remove(&name) {
            Some(current) if current.content == ip => {}
            Some(current) => {
                changeset.deletes.push(DeleteOp::new(current.id, name.clone()));
                changeset.creates.push(CreateOp::new(name.clone(), ip.clone()));
                changeset.changes.push(Change::Replace {
                    name,
                    previous: current.content,
                    content: ip,
                });
            }
            None => {
                changeset.creates.push(CreateOp::new(name.clone(), ip.clone()));
                changeset.changes.push(Change::Create { name, content: ip });
            }
        }
    }

    // Whatever no target claimed is stale
    for (name, stale) in observed.into_entries() {
        changeset.deletes.push(DeleteOp::new(stale.id, name.clone()));
        changeset.changes.push(Change::Delete {
            name,
            content: stale.content,
        });
    }

    changeset
}
