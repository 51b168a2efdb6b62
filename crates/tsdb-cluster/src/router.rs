//! Shard router: maps `(database, retention_policy, timestamp,
//! series_key)` to a shard and its replica owner set.

use crate::error::ClusterError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tsdb_base::series_key::fnv1a64;
use tsdb_base::{now_nanos, DataNodeId, ShardGroupId, ShardId};
use tsdb_broker::Broker;
use tsdb_meta::catalog::{Database, Shard, ShardGroup};
use tsdb_meta::log::LogRecord;
use tsdb_meta::{Catalog, MetaError, Metastore};

/// How far into the future a write's timestamp may sit before it is
/// rejected, independent of retention.
const DEFAULT_FUTURE_WRITE_SKEW_NANOS: i64 = 10 * 60 * 1_000_000_000; // 10 minutes

#[derive(Clone)]
pub struct ShardRouter {
    broker: Arc<dyn Broker>,
    meta: Metastore,
    future_write_skew_nanos: i64,
}

pub struct Placement {
    pub shard_group: ShardGroupId,
    pub shard: ShardId,
    pub owners: BTreeSet<DataNodeId>,
}

impl ShardRouter {
    pub fn new(broker: Arc<dyn Broker>, meta: Metastore) -> Self {
        Self {
            broker,
            meta,
            future_write_skew_nanos: DEFAULT_FUTURE_WRITE_SKEW_NANOS,
        }
    }

    pub fn with_future_write_skew(mut self, nanos: i64) -> Self {
        self.future_write_skew_nanos = nanos;
        self
    }

    /// Resolves (creating a shard group if one doesn't yet exist for the
    /// window) the shard owning `series_key` at `timestamp_nanos`.
    pub async fn route(
        &self,
        database: &str,
        policy_name: &str,
        series_key: &str,
        timestamp_nanos: i64,
    ) -> Result<Placement, ClusterError> {
        let snapshot = self.meta.snapshot().await;
        let db = snapshot
            .databases
            .get(database)
            .ok_or(MetaError::DatabaseNotFound)?;
        let policy = db
            .policy_or_default(policy_name)
            .ok_or(MetaError::DefaultRetentionPolicyNotFound)?
            .clone();

        if let Some(duration) = policy.duration_nanos {
            if timestamp_nanos < now_nanos() - duration {
                return Err(ClusterError::RetentionExceeded);
            }
        }
        if timestamp_nanos > now_nanos() + self.future_write_skew_nanos {
            return Err(ClusterError::FutureWriteSkew);
        }

        let window = shard_group_window(timestamp_nanos, policy.shard_group_duration_nanos);

        let group = match find_group(db, &policy.name, window) {
            Some(group) => group.clone(),
            None => {
                self.create_shard_group(&snapshot, database, &policy.name, window)
                    .await?
            }
        };

        let shard_index = (fnv1a64(series_key.as_bytes()) as usize) % group.shards.len().max(1);
        let shard = &group.shards[shard_index];

        Ok(Placement {
            shard_group: group.id,
            shard: shard.id,
            owners: shard.owners.clone(),
        })
    }

    async fn create_shard_group(
        &self,
        snapshot: &Catalog,
        database: &str,
        policy_name: &str,
        window: (i64, i64),
    ) -> Result<ShardGroup, ClusterError> {
        let db = snapshot
            .databases
            .get(database)
            .ok_or(MetaError::DatabaseNotFound)?;
        let policy = db
            .retention_policies
            .get(policy_name)
            .ok_or(MetaError::RetentionPolicyNotFound)?;

        let live_nodes: Vec<_> = snapshot
            .data_nodes
            .values()
            .filter(|n| n.status == tsdb_meta::catalog::DataNodeStatus::Live)
            .collect();
        if live_nodes.is_empty() {
            return Err(ClusterError::NoLiveDataNodes);
        }

        let owners = least_loaded(&live_nodes, snapshot, policy.replica_n as usize);
        let group_id = ShardGroupId(snapshot.next_shard_group_id);
        let shard_id = ShardId(snapshot.next_shard_id);

        let record = LogRecord::CreateShardGroup {
            database: database.to_string(),
            policy: policy_name.to_string(),
            id: group_id,
            start_nanos: window.0,
            end_nanos: window.1,
            shards: vec![(shard_id, owners.iter().copied().collect())],
        };
        self.meta.validate(&record).await?;
        let index = self
            .broker
            .propose(record)
            .await
            .map_err(|e| ClusterError::Broker(e.to_string()))?;
        self.meta.wait_for_index(index).await;

        let latest = self.meta.snapshot().await;
        let db = latest
            .databases
            .get(database)
            .ok_or(MetaError::DatabaseNotFound)?;
        find_group(db, policy_name, window)
            .cloned()
            .ok_or(ClusterError::NoLiveDataNodes)
    }
}

fn shard_group_window(timestamp_nanos: i64, shard_group_duration_nanos: i64) -> (i64, i64) {
    let start = (timestamp_nanos.div_euclid(shard_group_duration_nanos)) * shard_group_duration_nanos;
    (start, start + shard_group_duration_nanos)
}

fn find_group<'a>(db: &'a Database, policy: &str, window: (i64, i64)) -> Option<&'a ShardGroup> {
    db.shard_groups
        .values()
        .find(|g| g.policy == policy && g.start_nanos == window.0 && g.end_nanos == window.1)
}

/// Picks the `replica_n` least-loaded live nodes (load = number of shards
/// they currently own across the catalog), tie-broken by ascending node id
/// for determinism.
fn least_loaded(
    live_nodes: &[&tsdb_meta::catalog::DataNode],
    snapshot: &Catalog,
    replica_n: usize,
) -> Vec<DataNodeId> {
    let mut load: std::collections::BTreeMap<DataNodeId, usize> =
        live_nodes.iter().map(|n| (n.id, 0)).collect();
    for db in snapshot.databases.values() {
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

    let mut candidates: Vec<DataNodeId> = live_nodes.iter().map(|n| n.id).collect();
    candidates.sort_by_key(|id| (load.get(id).copied().unwrap_or(0), id.0));
    candidates
        .into_iter()
        .take(replica_n.min(live_nodes.len()).max(1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsdb_broker::LocalBroker;
    use tsdb_meta::catalog::RetentionPolicy;

    async fn propose_and_wait(broker: &LocalBroker, meta: &Metastore, record: LogRecord) {
        let index = broker.propose(record).await.unwrap();
        meta.wait_for_index(index).await;
    }

    async fn setup() -> (ShardRouter, Metastore, Arc<LocalBroker>) {
        let broker = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        tsdb_broker::spawn_apply_loop(broker.clone(), meta.clone());

        propose_and_wait(
            &broker,
            &meta,
            LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        )
        .await;
        propose_and_wait(
            &broker,
            &meta,
            LogRecord::CreateRetentionPolicy {
                database: "db".to_string(),
                policy: RetentionPolicy {
                    name: "default".to_string(),
                    duration_nanos: None,
                    replica_n: 1,
                    shard_group_duration_nanos: 3600_000_000_000,
                },
                set_default: true,
            },
        )
        .await;
        propose_and_wait(
            &broker,
            &meta,
            LogRecord::AssignDataNode {
                id: DataNodeId(1),
                url: "http://a:8086".to_string(),
            },
        )
        .await;

        let router = ShardRouter::new(broker.clone(), meta.clone());
        (router, meta, broker)
    }

    #[tokio::test]
    async fn routes_are_stable_across_calls() {
        let (router, _meta, _broker) = setup().await;
        let now = now_nanos();
        let a = router.route("db", "", "cpu\0host=a", now).await.unwrap();
        let b = router.route("db", "", "cpu\0host=a", now).await.unwrap();
        assert_eq!(a.shard, b.shard);
    }

    #[tokio::test]
    async fn missing_default_policy_fails() {
        let broker = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        meta.apply_committed(&tsdb_meta::log::Entry {
            index: 1,
            record: LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        })
        .await
        .unwrap();
        let router = ShardRouter::new(broker, meta);
        let err = router
            .route("db", "", "cpu", now_nanos())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClusterError::Meta(MetaError::DefaultRetentionPolicyNotFound)
        ));
    }

    #[tokio::test]
    async fn retention_exceeded_is_rejected() {
        let broker = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        meta.apply_committed(&tsdb_meta::log::Entry {
            index: 1,
            record: LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        })
        .await
        .unwrap();
        meta.apply_committed(&tsdb_meta::log::Entry {
            index: 2,
            record: LogRecord::CreateRetentionPolicy {
                database: "db".to_string(),
                policy: RetentionPolicy {
                    name: "short".to_string(),
                    duration_nanos: Some(1_000_000_000),
                    replica_n: 1,
                    shard_group_duration_nanos: 3600_000_000_000,
                },
                set_default: true,
            },
        })
        .await
        .unwrap();
        meta.apply_committed(&tsdb_meta::log::Entry {
            index: 3,
            record: LogRecord::AssignDataNode {
                id: DataNodeId(1),
                url: "http://a:8086".to_string(),
            },
        })
        .await
        .unwrap();
        let router = ShardRouter::new(broker, meta);
        let old_ts = now_nanos() - 2_000_000_000;
        let err = router.route("db", "", "cpu", old_ts).await.unwrap_err();
        assert!(matches!(err, ClusterError::RetentionExceeded));
    }
}
