//! Continuous-query runner: on each tick, lists CQs from the
//! metastore, attempts a 30s lease per CQ id so only one node executes a
//! given CQ's next run, executes the source query through the query
//! pipeline, and writes the result back into the target measurement
//! through the write pipeline, atomically advancing `last_run`.
//!
//! Modeled on the lease/dequeue/jitter idiom this workspace's task-executor
//! server uses for its own polling loop: failures are logged and retried
//! next tick, never panicking the runner task (the recovery boundary
//! mirrors the HTTP surface's).

use crate::error::CqError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tsdb_base::{now_nanos, DataNodeId, Scalar};
use tsdb_broker::Broker;
use tsdb_meta::catalog::ContinuousQuery;
use tsdb_meta::log::LogRecord;
use tsdb_meta::{MetaError, Metastore};
use tsdb_query::QueryPipeline;
use tsdb_write::{BatchPoints, WireTimestamp, WirePoint, WriteCoordinator};

/// How long a CQ lease is held before another node may take it over.
pub const LEASE_NANOS: i64 = 30 * 1_000_000_000;
const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct ContinuousQueryRunner {
    meta: Metastore,
    broker: Arc<dyn Broker>,
    pipeline: Arc<QueryPipeline>,
    writer: Arc<WriteCoordinator>,
    local_node: DataNodeId,
}

impl ContinuousQueryRunner {
    pub fn new(
        meta: Metastore,
        broker: Arc<dyn Broker>,
        pipeline: Arc<QueryPipeline>,
        writer: Arc<WriteCoordinator>,
        local_node: DataNodeId,
    ) -> Self {
        Self {
            meta,
            broker,
            pipeline,
            writer,
            local_node,
        }
    }

    /// Runs the tick loop until `shutdown` resolves. The sleep is jittered
    /// +/-10%, matching the dequeue-interval jitter of the workspace's other
    /// polling loop, so nodes racing for the same lease don't all wake in
    /// lockstep.
    pub async fn run(self: Arc<Self>, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            let jitter = 0.9 + rand::random::<f64>() * 0.2;
            tokio::select! {
                _ = tokio::time::sleep(TICK_INTERVAL.mul_f64(jitter)) => {}
                _ = &mut shutdown => return,
            }
            self.tick().await;
        }
    }

    /// Runs a single tick immediately, independent of the jittered loop in
    /// [`Self::run`]. Exposed for `POST /process_continuous_queries`, which
    /// triggers an out-of-band pass.
    pub async fn tick(&self) {
        let snapshot = self.meta.snapshot().await;
        let now = now_nanos();
        for db in snapshot.databases.values() {
            for cq in db.continuous_queries.values() {
                match self.run_one(&db.name, cq, now).await {
                    Ok(()) => {}
                    Err(CqError::Meta(MetaError::LeaseHeld)) => {
                        tracing::debug!(database = %db.name, cq = %cq.name, "cq lease held by another node");
                    }
                    Err(err) => {
                        tracing::warn!(
                            database = %db.name,
                            cq = %cq.name,
                            %err,
                            "continuous query tick failed, retrying next tick"
                        );
                    }
                }
            }
        }
    }

    async fn run_one(
        &self,
        database: &str,
        cq: &ContinuousQuery,
        now: i64,
    ) -> Result<(), CqError> {
        let next_boundary = cq.last_run_nanos + cq.interval_nanos;
        if now < next_boundary {
            return Ok(());
        }

        self.acquire_lease(database, &cq.name, now).await?;

        let results = self.pipeline.query_system(database, &cq.source_query).await?;
        let points = results_to_points(&results, &cq.target_measurement);
        if !points.is_empty() {
            let batch = BatchPoints {
                database: database.to_string(),
                retention_policy: String::new(),
                tags: BTreeMap::new(),
                timestamp: None,
                precision: None,
                points,
            };
            self.writer.write_system(batch).await?;
        }

        self.advance(database, &cq.name, next_boundary).await
    }

    async fn acquire_lease(&self, database: &str, name: &str, now: i64) -> Result<(), CqError> {
        let record = LogRecord::AcquireCqLease {
            database: database.to_string(),
            name: name.to_string(),
            holder: self.local_node,
            now_nanos: now,
            lease_nanos: LEASE_NANOS,
        };
        self.propose(record).await
    }

    async fn advance(&self, database: &str, name: &str, last_run_nanos: i64) -> Result<(), CqError> {
        let record = LogRecord::AdvanceContinuousQuery {
            database: database.to_string(),
            name: name.to_string(),
            last_run_nanos,
        };
        self.propose(record).await
    }

    async fn propose(&self, record: LogRecord) -> Result<(), CqError> {
        self.meta.validate(&record).await?;
        let index = self
            .broker
            .propose(record)
            .await
            .map_err(|e| CqError::Broker(e.to_string()))?;
        self.meta.wait_for_index(index).await;
        Ok(())
    }
}

/// Flattens query results into points for the CQ's target measurement: one
/// point per merged row, tags carried over from the source series.
fn results_to_points(
    results: &[tsdb_query::StatementResult],
    target_measurement: &str,
) -> Vec<WirePoint> {
    let mut points = Vec::new();
    for result in results {
        if result.error.is_some() {
            continue;
        }
        for series in &result.series {
            for row in &series.values {
                let Some(timestamp_nanos) = row.first().and_then(|v| v.as_i64()) else {
                    continue;
                };
                let mut values = BTreeMap::new();
                for (column, cell) in series.columns.iter().zip(row.iter()).skip(1) {
                    if let Ok(scalar) = serde_json::from_value::<Scalar>(cell.clone()) {
                        values.insert(column.clone(), scalar);
                    }
                }
                if values.is_empty() {
                    continue;
                }
                points.push(WirePoint {
                    name: target_measurement.to_string(),
                    tags: series.tags.clone(),
                    timestamp: Some(WireTimestamp::Epoch(timestamp_nanos)),
                    precision: Some("n".to_string()),
                    values,
                });
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsdb_auth::AuthService;
    use tsdb_base::{DataNodeId as NodeId, ShardGroupId, ShardId};
    use tsdb_broker::LocalBroker;
    use tsdb_cluster::{DataNodeRegistry, ShardRouter};
    use tsdb_meta::catalog::RetentionPolicy;
    use tsdb_query::InMemoryShardExecutor;
    use tsdb_write::replica::HttpReplicaTransport;
    use tsdb_write::{InMemoryShardStore, ShardStore, StoredPoint};

    async fn propose_and_wait(broker: &dyn Broker, meta: &Metastore, record: LogRecord) {
        let index = broker.propose(record).await.unwrap();
        meta.wait_for_index(index).await;
    }

    async fn setup() -> (Arc<ContinuousQueryRunner>, Metastore) {
        let broker: Arc<dyn Broker> = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        tsdb_broker::spawn_apply_loop(broker.clone(), meta.clone());

        propose_and_wait(
            &*broker,
            &meta,
            LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        )
        .await;
        propose_and_wait(
            &*broker,
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
            &*broker,
            &meta,
            LogRecord::AssignDataNode {
                id: NodeId(1),
                url: "http://a:8086".to_string(),
            },
        )
        .await;
        propose_and_wait(
            &*broker,
            &meta,
            LogRecord::EnsureMeasurement {
                database: "db".to_string(),
                measurement: "cpu".to_string(),
            },
        )
        .await;
        propose_and_wait(
            &*broker,
            &meta,
            LogRecord::CreateShardGroup {
                database: "db".to_string(),
                policy: "default".to_string(),
                id: ShardGroupId(1),
                start_nanos: 0,
                end_nanos: 3600_000_000_000,
                shards: vec![(ShardId(1), [NodeId(1)].into_iter().collect())],
            },
        )
        .await;
        propose_and_wait(
            &*broker,
            &meta,
            LogRecord::CreateContinuousQuery {
                database: "db".to_string(),
                cq: ContinuousQuery {
                    name: "cq1".to_string(),
                    database: "db".to_string(),
                    source_query: "SELECT * FROM cpu".to_string(),
                    target_measurement: "cpu_1h".to_string(),
                    interval_nanos: 1,
                    last_run_nanos: 0,
                },
            },
        )
        .await;

        let store = Arc::new(InMemoryShardStore::new());
        store.write(
            ShardId(1),
            "cpu\0host=a".to_string(),
            StoredPoint {
                measurement: "cpu".to_string(),
                tags: [("host".to_string(), "a".to_string())].into_iter().collect(),
                timestamp_nanos: 10,
                fields: [("v".to_string(), Scalar::Int(1))].into_iter().collect(),
                write_timestamp_nanos: 10,
            },
        );

        let auth = AuthService::new(broker.clone(), meta.clone());
        let executor = Arc::new(InMemoryShardExecutor::new(store.clone()));
        let pipeline = Arc::new(QueryPipeline::new(meta.clone(), auth.clone(), executor));
        let router = ShardRouter::new(broker.clone(), meta.clone());
        let registry = DataNodeRegistry::new(broker.clone(), meta.clone());
        let writer = Arc::new(WriteCoordinator::new(
            broker.clone(),
            meta.clone(),
            auth,
            router,
            registry,
            store,
            Arc::new(HttpReplicaTransport::new()),
            NodeId(1),
            1,
        ));

        let runner = Arc::new(ContinuousQueryRunner::new(
            meta.clone(),
            broker,
            pipeline,
            writer,
            NodeId(1),
        ));
        (runner, meta)
    }

    #[tokio::test]
    async fn tick_materializes_source_query_into_target_measurement() {
        let (runner, meta) = setup().await;
        runner.tick().await;

        let snapshot = meta.snapshot().await;
        let db = snapshot.databases.get("db").unwrap();
        assert!(db.measurements.contains_key("cpu_1h"));

        let cq = db.continuous_queries.get("cq1").unwrap();
        assert!(cq.last_run_nanos > 0);
    }

    #[tokio::test]
    async fn second_tick_is_a_no_op_before_the_next_boundary() {
        let (runner, meta) = setup().await;
        runner.tick().await;
        let first_run = meta
            .snapshot()
            .await
            .databases
            .get("db")
            .unwrap()
            .continuous_queries
            .get("cq1")
            .unwrap()
            .last_run_nanos;

        // interval_nanos is 1, so `now` always clears the next boundary;
        // advance last_run far into the future to simulate "already ran".
        propose_and_wait(
            &*runner.broker,
            &meta,
            LogRecord::AdvanceContinuousQuery {
                database: "db".to_string(),
                name: "cq1".to_string(),
                last_run_nanos: now_nanos() + 3_600_000_000_000,
            },
        )
        .await;

        runner.tick().await;
        let second_run = meta
            .snapshot()
            .await
            .databases
            .get("db")
            .unwrap()
            .continuous_queries
            .get("cq1")
            .unwrap()
            .last_run_nanos;
        assert!(second_run > first_run);
    }
}
