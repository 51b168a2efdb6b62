//! The typed log record applied to the catalog. Every catalog mutation is a
//! variant here; applying a record is idempotent on re-read, which is
//! what lets a node replay the log from index 0 on startup.

use crate::catalog::{
    Catalog, ContinuousQuery, CqLease, DataNode, DataNodeStatus, Database, Measurement, Privilege,
    RetentionPolicy, Shard, ShardGroup, MAX_FIELDS_PER_MEASUREMENT,
};
use crate::error::MetaError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tsdb_base::scalar::ScalarKind;
use tsdb_base::{DataNodeId, ShardGroupId, ShardId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogRecord {
    CreateDatabase {
        name: String,
    },
    DropDatabase {
        name: String,
    },
    CreateRetentionPolicy {
        database: String,
        policy: RetentionPolicy,
        set_default: bool,
    },
    DropRetentionPolicy {
        database: String,
        name: String,
    },
    SetDefaultRetentionPolicy {
        database: String,
        name: String,
    },
    CreateUser {
        name: String,
        password_hash: String,
        salt: String,
    },
    UpdateUserPassword {
        name: String,
        password_hash: String,
        salt: String,
    },
    DeleteUser {
        name: String,
    },
    SetPrivilege {
        user: String,
        database: String,
        privilege: Privilege,
    },
    CreateContinuousQuery {
        database: String,
        cq: ContinuousQuery,
    },
    DropContinuousQuery {
        database: String,
        name: String,
    },
    AdvanceContinuousQuery {
        database: String,
        name: String,
        last_run_nanos: i64,
    },
    AcquireCqLease {
        database: String,
        name: String,
        holder: DataNodeId,
        now_nanos: i64,
        lease_nanos: i64,
    },
    EnsureMeasurement {
        database: String,
        measurement: String,
    },
    ObserveFields {
        database: String,
        measurement: String,
        fields: Vec<(String, ScalarKind)>,
    },
    AssignDataNode {
        id: DataNodeId,
        url: String,
    },
    RemoveDataNode {
        id: DataNodeId,
    },
    CreateShardGroup {
        database: String,
        policy: String,
        id: ShardGroupId,
        start_nanos: i64,
        end_nanos: i64,
        shards: Vec<(ShardId, BTreeSet<DataNodeId>)>,
    },
}

/// A committed record, positioned by its log index. Indices start at zero
/// and are contiguous; `apply` is called in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub index: u64,
    pub record: LogRecord,
}

/// Apply one record to the catalog in place. Idempotent: re-applying a
/// record whose effect is already present (e.g. `CreateDatabase` for a
/// database that already exists because of a previous apply of the same
/// index) is a no-op rather than an error, since replay must never fail.
pub fn apply(catalog: &mut Catalog, record: &LogRecord) {
    match record {
        LogRecord::CreateDatabase { name } => {
            catalog
                .databases
                .entry(name.clone())
                .or_insert_with(|| Database::new(name.clone()));
        }
        LogRecord::DropDatabase { name } => {
            catalog.databases.remove(name);
        }
        LogRecord::CreateRetentionPolicy {
            database,
            policy,
            set_default,
        } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.retention_policies
                    .insert(policy.name.clone(), policy.clone());
                if *set_default || db.default_policy.is_none() {
                    db.default_policy = Some(policy.name.clone());
                }
            }
        }
        LogRecord::DropRetentionPolicy { database, name } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.retention_policies.remove(name);
                if db.default_policy.as_deref() == Some(name.as_str()) {
                    db.default_policy = None;
                }
                db.shard_groups.retain(|_, g| &g.policy != name);
            }
        }
        LogRecord::SetDefaultRetentionPolicy { database, name } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                if db.retention_policies.contains_key(name) {
                    db.default_policy = Some(name.clone());
                }
            }
        }
        LogRecord::CreateUser {
            name,
            password_hash,
            salt,
        } => {
            catalog
                .users
                .entry(name.clone())
                .or_insert_with(|| crate::catalog::User {
                    name: name.clone(),
                    password_hash: password_hash.clone(),
                    salt: salt.clone(),
                    privileges: Default::default(),
                });
        }
        _ => apply_rest(catalog, record),
    }
}

fn apply_rest(catalog: &mut Catalog, record: &LogRecord) {
    match record {
        LogRecord::DeleteUser { name } => {
            catalog.users.remove(name);
        }
        LogRecord::UpdateUserPassword {
            name,
            password_hash,
            salt,
        } => {
            if let Some(u) = catalog.users.get_mut(name) {
                u.password_hash = password_hash.clone();
                u.salt = salt.clone();
            }
        }
        LogRecord::SetPrivilege {
            user,
            database,
            privilege,
        } => {
            catalog
                .users
                .entry(user.clone())
                .or_insert_with(|| crate::catalog::User {
                    name: user.clone(),
                    password_hash: String::new(),
                    salt: String::new(),
                    privileges: Default::default(),
                })
                .privileges
                .insert(database.clone(), *privilege);
        }
        LogRecord::CreateContinuousQuery { database, cq } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.continuous_queries.insert(cq.name.clone(), cq.clone());
            }
        }
        LogRecord::DropContinuousQuery { database, name } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.continuous_queries.remove(name);
            }
        }
        LogRecord::AdvanceContinuousQuery {
            database,
            name,
            last_run_nanos,
        } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                if let Some(cq) = db.continuous_queries.get_mut(name) {
                    cq.last_run_nanos = *last_run_nanos;
                }
            }
        }
        LogRecord::AcquireCqLease {
            database,
            name,
            holder,
            now_nanos,
            lease_nanos,
        } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.cq_leases.insert(
                    name.clone(),
                    CqLease {
                        holder: *holder,
                        expires_at_nanos: now_nanos + lease_nanos,
                    },
                );
            }
        }
        LogRecord::EnsureMeasurement {
            database,
            measurement,
        } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.measurements
                    .entry(measurement.clone())
                    .or_insert_with(|| Measurement::new(measurement.clone()));
            }
        }
        LogRecord::ObserveFields {
            database,
            measurement,
            fields,
        } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                let m = db
                    .measurements
                    .entry(measurement.clone())
                    .or_insert_with(|| Measurement::new(measurement.clone()));
                for (name, kind) in fields {
                    if m.fields.len() >= MAX_FIELDS_PER_MEASUREMENT
                        && !m.fields.contains_key(name)
                    {
                        continue; // overflow is rejected earlier, at validation time
                    }
                    m.fields.entry(name.clone()).or_insert(*kind);
                }
            }
        }
        LogRecord::AssignDataNode { id, url } => {
            catalog.data_nodes.insert(
                *id,
                DataNode {
                    id: *id,
                    url: url.clone(),
                    status: DataNodeStatus::Live,
                },
            );
            if id.0 >= catalog.next_data_node_id {
                catalog.next_data_node_id = id.0 + 1;
            }
        }
        LogRecord::RemoveDataNode { id } => {
            catalog.data_nodes.remove(id);
            rebalance_after_removal(catalog, *id);
        }
        LogRecord::CreateShardGroup {
            database,
            policy,
            id,
            start_nanos,
            end_nanos,
            shards,
        } => {
            if let Some(db) = catalog.databases.get_mut(database) {
                db.shard_groups.entry(*id).or_insert_with(|| ShardGroup {
                    id: *id,
                    policy: policy.clone(),
                    start_nanos: *start_nanos,
                    end_nanos: *end_nanos,
                    shards: shards
                        .iter()
                        .map(|(sid, owners)| Shard {
                            id: *sid,
                            owners: owners.clone(),
                        })
                        .collect(),
                });
            }
            if id.0 >= catalog.next_shard_group_id {
                catalog.next_shard_group_id = id.0 + 1;
            }
            for (sid, _) in shards {
                if sid.0 >= catalog.next_shard_id {
                    catalog.next_shard_id = sid.0 + 1;
                }
            }
        }
        _ => unreachable!("handled in apply()"),
    }
}

/// Restores the `min(replica_n, |live data nodes|)` owner-set-size
/// invariant after a node leaves: drops `removed` from every shard that
/// owned it, then backfills each shard short of its target size from the
/// remaining live nodes, least-loaded first, tied by ascending node id.
/// Mirrors `tsdb_cluster::router::least_loaded`'s tie-break, duplicated
/// here rather than shared because `tsdb-meta` sits below `tsdb-cluster`
/// in the dependency graph.
fn rebalance_after_removal(catalog: &mut Catalog, removed: DataNodeId) {
    let live_ids: Vec<DataNodeId> = catalog
        .data_nodes
        .values()
        .filter(|n| n.status == DataNodeStatus::Live)
        .map(|n| n.id)
        .collect();

    if live_ids.is_empty() {
        for db in catalog.databases.values_mut() {
            for group in db.shard_groups.values_mut() {
                for shard in &mut group.shards {
                    shard.owners.remove(&removed);
                }
            }
        }
        return;
    }

    let mut load: BTreeMap<DataNodeId, usize> = live_ids.iter().map(|id| (*id, 0)).collect();
    for db in catalog.databases.values() {
        for group in db.shard_groups.values() {
            for shard in &group.shards {
                for owner in &shard.owners {
                    if let Some(count) = load.get_mut(owner) {
                        *count += 1;
                    }
                }
            }
        }
    }

    for db in catalog.databases.values_mut() {
        let replica_n: BTreeMap<String, u32> = db
            .retention_policies
            .iter()
            .map(|(name, policy)| (name.clone(), policy.replica_n))
            .collect();
        for group in db.shard_groups.values_mut() {
            let target = (replica_n.get(&group.policy).copied().unwrap_or(1) as usize)
                .min(live_ids.len())
                .max(1);
            for shard in &mut group.shards {
                if !shard.owners.remove(&removed) {
                    continue;
                }
                while shard.owners.len() < target {
                    let pick = live_ids
                        .iter()
                        .copied()
                        .filter(|id| !shard.owners.contains(id))
                        .min_by_key(|id| (load.get(id).copied().unwrap_or(0), id.0));
                    let Some(pick) = pick else { break };
                    shard.owners.insert(pick);
                    *load.entry(pick).or_insert(0) += 1;
                }
            }
        }
    }
}

/// Validate a record against the current catalog *before* proposing it, so
/// that obviously-invalid proposals (duplicate database name, etc.) fail
/// fast with the taxonomy in [`MetaError`] instead of being silently
/// absorbed by `apply`'s idempotent no-ops.
pub fn validate(catalog: &Catalog, record: &LogRecord) -> Result<(), MetaError> {
    match record {
        LogRecord::CreateDatabase { name } => {
            if name.is_empty() {
                return Err(MetaError::DatabaseNameRequired);
            }
            if catalog.databases.contains_key(name) {
                return Err(MetaError::DatabaseExists);
            }
        }
        LogRecord::DropDatabase { name } => {
            if !catalog.databases.contains_key(name) {
                return Err(MetaError::DatabaseNotFound);
            }
        }
        LogRecord::CreateRetentionPolicy {
            database, policy, ..
        } => {
            let db = catalog
                .databases
                .get(database)
                .ok_or(MetaError::DatabaseNotFound)?;
            if policy.name.is_empty() {
                return Err(MetaError::RetentionPolicyNameRequired);
            }
            if policy.replica_n < 1 {
                return Err(MetaError::InvalidReplicaN);
            }
            if db.retention_policies.contains_key(&policy.name) {
                return Err(MetaError::RetentionPolicyExists);
            }
        }
        LogRecord::DropRetentionPolicy { database, name } => {
            let db = catalog
                .databases
                .get(database)
                .ok_or(MetaError::DatabaseNotFound)?;
            if !db.retention_policies.contains_key(name) {
                return Err(MetaError::RetentionPolicyNotFound);
            }
        }
        LogRecord::SetDefaultRetentionPolicy { database, name } => {
            let db = catalog
                .databases
                .get(database)
                .ok_or(MetaError::DatabaseNotFound)?;
            if !db.retention_policies.contains_key(name) {
                return Err(MetaError::RetentionPolicyNotFound);
            }
        }
        LogRecord::CreateUser { name, .. } => {
            if name.is_empty()
                || name.chars().any(|c| c.is_whitespace() || c == ':' || c == '/')
                || !name.chars().all(|c| c.is_ascii_graphic())
            {
                return Err(MetaError::InvalidUserName);
            }
            if catalog.users.contains_key(name) {
                return Err(MetaError::UserExists);
            }
        }
        LogRecord::UpdateUserPassword { name, .. } | LogRecord::DeleteUser { name } => {
            if !catalog.users.contains_key(name) {
                return Err(MetaError::UserNotFound);
            }
        }
        LogRecord::CreateContinuousQuery { database, cq } => {
            let db = catalog
                .databases
                .get(database)
                .ok_or(MetaError::DatabaseNotFound)?;
            if db.continuous_queries.contains_key(&cq.name) {
                return Err(MetaError::ContinuousQueryExists);
            }
        }
        LogRecord::DropContinuousQuery { database, name } => {
            let db = catalog
                .databases
                .get(database)
                .ok_or(MetaError::DatabaseNotFound)?;
            if !db.continuous_queries.contains_key(name) {
                return Err(MetaError::ContinuousQueryNotFound);
            }
        }
        LogRecord::AcquireCqLease {
            database,
            name,
            holder,
            now_nanos,
            ..
        } => {
            let db = catalog
                .databases
                .get(database)
                .ok_or(MetaError::DatabaseNotFound)?;
            if !db.continuous_queries.contains_key(name) {
                return Err(MetaError::ContinuousQueryNotFound);
            }
            if let Some(existing) = db.cq_leases.get(name) {
                if existing.holder != *holder && existing.expires_at_nanos > *now_nanos {
                    return Err(MetaError::LeaseHeld);
                }
            }
        }
        LogRecord::AssignDataNode { url, .. } => {
            if url.is_empty() {
                return Err(MetaError::DataNodeURLRequired);
            }
            if catalog.data_nodes.values().any(|n| &n.url == url) {
                return Err(MetaError::DataNodeExists);
            }
        }
        LogRecord::RemoveDataNode { id } => {
            if !catalog.data_nodes.contains_key(id) {
                return Err(MetaError::DataNodeNotFound);
            }
        }
        _ => {}
    }
    Ok(())
}
