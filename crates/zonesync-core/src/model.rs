//! Data model shared by the reconciler, the engine and the collaborators
//!
//! Every value here is built fresh from the two snapshots of a run and
//! discarded at the end of it. Nothing is persisted across runs.

use serde::{Deserialize, Serialize};

/// The only record type this system manages
pub const RECORD_TYPE_A: &str = "A";

/// TTL applied to every record created by a reconciliation
pub const MANAGED_TTL: u32 = 3600;

/// One inventory entry: a machine's hostname and IPv4 address
///
/// Either field may be missing when the inventory has not finished
/// provisioning the machine. Such entries are skipped by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Short hostname, without the managed suffix
    pub hostname: Option<String>,
    /// Dotted-quad IPv4 address
    pub ipv4: Option<String>,
}

impl Target {
    /// Create a fully provisioned target
    pub fn new(hostname: impl Into<String>, ipv4: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            ipv4: Some(ipv4.into()),
        }
    }

    /// Hostname and address, if both are present and non-empty
    pub fn parts(&self) -> Option<(&str, &str)> {
        let hostname = self.hostname.as_deref().filter(|h| !h.is_empty())?;
        let ipv4 = self.ipv4.as_deref().filter(|ip| !ip.is_empty())?;
        Some((hostname, ipv4))
    }
}

/// An existing DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRecord {
    /// Opaque provider identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the IPv4 address for A-records)
    pub content: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time-to-live, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Whether the provider proxies traffic for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

impl ObservedRecord {
    /// Create an A-record with no ttl or proxy information
    pub fn a(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            record_type: RECORD_TYPE_A.to_string(),
            ttl: None,
            proxied: None,
        }
    }

    /// Whether this record is an A-record under `suffix`
    pub fn is_managed(&self, suffix: &str) -> bool {
        self.record_type == RECORD_TYPE_A && name_under_suffix(&self.name, suffix)
    }
}

/// Record creation, serialized as one entry of a batch's `posts` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOp {
    /// Always `"A"`
    #[serde(rename = "type")]
    pub record_type: String,
    /// Fully-qualified record name
    pub name: String,
    /// IPv4 address
    pub content: String,
    /// Always [`MANAGED_TTL`]
    pub ttl: u32,
    /// Always `false`: these records are internal-only
    pub proxied: bool,
}

impl CreateOp {
    /// Create an A-record operation with the fixed ttl and proxy settings
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            record_type: RECORD_TYPE_A.to_string(),
            name: name.into(),
            content: content.into(),
            ttl: MANAGED_TTL,
            proxied: false,
        }
    }
}

/// Record deletion, serialized as one entry of a batch's `deletes` array
///
/// The provider deletes by id; `name` is kept for logs only and is not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOp {
    /// Provider identifier of the record to delete
    pub id: String,
    /// Record name, for diagnostics
    #[serde(default, skip_serializing)]
    pub name: String,
}

impl DeleteOp {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One combined request carrying every change of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Records to create
    pub posts: Vec<CreateOp>,
    /// Records to delete
    pub deletes: Vec<DeleteOp>,
}

impl BatchRequest {
    pub fn new(posts: Vec<CreateOp>, deletes: Vec<DeleteOp>) -> Self {
        Self { posts, deletes }
    }

    /// A run with nothing to change must not reach the provider
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.deletes.is_empty()
    }

    /// Total number of operations in the batch
    pub fn len(&self) -> usize {
        self.posts.len() + self.deletes.len()
    }
}

/// Provider's answer to a successfully submitted batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records created by the batch
    pub created: Vec<ObservedRecord>,
    /// Ids of the records deleted by the batch
    pub deleted: Vec<String>,
}

/// Keep only the records this system owns: A-records under `suffix`
pub fn managed_records(records: Vec<ObservedRecord>, suffix: &str) -> Vec<ObservedRecord> {
    records
        .into_iter()
        .filter(|record| record.is_managed(suffix))
        .collect()
}

/// Fully-qualified name of a host under the managed suffix
pub fn qualified_name(hostname: &str, suffix: &str) -> String {
    format!("{}.{}", hostname, suffix)
}

fn name_under_suffix(name: &str, suffix: &str) -> bool {
    name.strip_suffix(suffix)
        .is_some_and(|head| head.len() > 1 && head.ends_with('.'))
}
