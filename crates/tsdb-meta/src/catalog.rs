//! Catalog entity types. These are pure data: all mutation happens through
//! [`crate::log::LogRecord`] application in [`crate::store::Metastore`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tsdb_base::scalar::ScalarKind;
use tsdb_base::{DataNodeId, ShardGroupId, ShardId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub databases: BTreeMap<String, Database>,
    /// Users are cluster-wide (a `User`'s privilege map references database
    /// names and the cluster-admin wildcard `"*"`, which only makes sense if
    /// identity is not scoped to one database) — see DESIGN.md for the
    /// resolution of this ambiguity in the data model.
    pub users: BTreeMap<String, User>,
    pub data_nodes: BTreeMap<DataNodeId, DataNode>,
    pub next_data_node_id: u64,
    pub next_shard_group_id: u64,
    pub next_shard_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub retention_policies: BTreeMap<String, RetentionPolicy>,
    pub default_policy: Option<String>,
    pub continuous_queries: BTreeMap<String, ContinuousQuery>,
    pub cq_leases: BTreeMap<String, CqLease>,
    pub measurements: BTreeMap<String, Measurement>,
    pub shard_groups: BTreeMap<ShardGroupId, ShardGroup>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retention_policies: BTreeMap::new(),
            default_policy: None,
            continuous_queries: BTreeMap::new(),
            cq_leases: BTreeMap::new(),
            measurements: BTreeMap::new(),
            shard_groups: BTreeMap::new(),
        }
    }

    pub fn policy_or_default<'a>(&'a self, requested: &str) -> Option<&'a RetentionPolicy> {
        if requested.is_empty() {
            self.default_policy
                .as_ref()
                .and_then(|name| self.retention_policies.get(name))
        } else {
            self.retention_policies.get(requested)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub name: String,
    /// Duration in nanoseconds; `None` means infinite retention.
    pub duration_nanos: Option<i64>,
    pub replica_n: u32,
    pub shard_group_duration_nanos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    /// Field name -> observed scalar kind. Append-only: a conflicting type
    /// for an existing name is rejected by the write pipeline before it
    /// ever reaches the metastore.
    pub fields: BTreeMap<String, ScalarKind>,
}

impl Measurement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// Maximum distinct field names a single measurement may accumulate.
pub const MAX_FIELDS_PER_MEASUREMENT: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub password_hash: String,
    pub salt: String,
    /// "*" is the cluster-admin wildcard; otherwise a database name.
    pub privileges: BTreeMap<String, Privilege>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Privilege {
    pub read: bool,
    pub write: bool,
}

impl Privilege {
    pub fn admin() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousQuery {
    pub name: String,
    pub database: String,
    pub source_query: String,
    pub target_measurement: String,
    pub interval_nanos: i64,
    pub last_run_nanos: i64,
}

/// A 30s-TTL lease granting one data node the right to run a single CQ's
/// next tick. Leases live alongside the CQ they guard rather than
/// inline on `ContinuousQuery` so that acquiring one doesn't race with
/// `AdvanceContinuousQuery`/`CreateContinuousQuery` proposals for the same
/// record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CqLease {
    pub holder: DataNodeId,
    pub expires_at_nanos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataNode {
    pub id: DataNodeId,
    pub url: String,
    pub status: DataNodeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataNodeStatus {
    Live,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardGroup {
    pub id: ShardGroupId,
    pub policy: String,
    pub start_nanos: i64,
    pub end_nanos: i64,
    pub shards: Vec<Shard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    pub id: ShardId,
    pub owners: BTreeSet<DataNodeId>,
}
