//! Query pipeline: parses a statement list, authorizes per referenced
//! database, resolves the shard set for each statement, dispatches to
//! [`crate::executor::ShardExecutor`], and merges results in a deterministic
//! order. On the first statement error, every subsequent statement's result
//! becomes `NotExecuted`.

use crate::error::QueryError;
use crate::executor::{SeriesPoint, ShardExecutor};
use crate::merge::merge;
use crate::statement::{parse_statements, Statement};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tsdb_auth::{AuthService, Principal};
use tsdb_base::ShardId;
use tsdb_meta::catalog::Database;
use tsdb_meta::Metastore;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatementResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<WireSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireSeries {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<serde_json::Value>>,
}

pub struct QueryPipeline {
    meta: Metastore,
    auth: AuthService,
    executor: Arc<dyn ShardExecutor>,
}

impl QueryPipeline {
    pub fn new(meta: Metastore, auth: AuthService, executor: Arc<dyn ShardExecutor>) -> Self {
        Self {
            meta,
            auth,
            executor,
        }
    }

    /// Runs every statement in `query_text` against `database`, requiring
    /// read privilege on it up front (cross-database statements are not
    /// supported by the minimal statement grammar this workspace ships).
    pub async fn query(
        &self,
        principal: &Principal,
        database: &str,
        query_text: &str,
    ) -> Result<Vec<StatementResult>, QueryError> {
        if database.is_empty() {
            return Err(QueryError::DatabaseRequired);
        }
        self.auth.authorize_read(principal, database).await?;
        self.query_unchecked(database, query_text).await
    }

    /// Runs a query without an authorization check. Used by the
    /// continuous-query runner, which is a trusted internal caller
    /// rather than an HTTP-facing principal.
    pub async fn query_system(
        &self,
        database: &str,
        query_text: &str,
    ) -> Result<Vec<StatementResult>, QueryError> {
        if database.is_empty() {
            return Err(QueryError::DatabaseRequired);
        }
        self.query_unchecked(database, query_text).await
    }

    async fn query_unchecked(
        &self,
        database: &str,
        query_text: &str,
    ) -> Result<Vec<StatementResult>, QueryError> {
        let statements = parse_statements(query_text)?;
        let mut results = Vec::with_capacity(statements.len());
        let mut halted = false;

        for stmt in statements {
            if halted {
                results.push(StatementResult {
                    series: Vec::new(),
                    error: Some(QueryError::NotExecuted.to_string()),
                });
                continue;
            }
            match self.execute_statement(database, &stmt).await {
                Ok(series) => results.push(StatementResult {
                    series,
                    error: None,
                }),
                Err(err) => {
                    halted = true;
                    results.push(StatementResult {
                        series: Vec::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(results)
    }

    async fn execute_statement(
        &self,
        database: &str,
        stmt: &Statement,
    ) -> Result<Vec<WireSeries>, QueryError> {
        let Statement::Select { measurement, .. } = stmt;
        let snapshot = self.meta.snapshot().await;
        let db = snapshot
            .databases
            .get(database)
            .ok_or(QueryError::DatabaseNotFound)?;
        if !db.measurements.contains_key(measurement) {
            return Err(QueryError::MeasurementNotFound);
        }

        let mut batches = Vec::new();
        for shard in shards_for_measurement(db) {
            batches.push(self.executor.execute(shard, stmt).await?);
        }

        Ok(group_series(merge(batches)))
    }
}

/// The shard set a statement's measurement might live in: every shard
/// across every shard group in the database. The minimal statement grammar
/// has no tag predicate to narrow this further (the storage/execution
/// engine that would is out of scope).
fn shards_for_measurement(db: &Database) -> Vec<ShardId> {
    db.shard_groups
        .values()
        .flat_map(|g| g.shards.iter().map(|s| s.id))
        .collect()
}

fn group_series(points: Vec<SeriesPoint>) -> Vec<WireSeries> {
    let mut grouped: BTreeMap<String, WireSeries> = BTreeMap::new();
    for point in points {
        let series = grouped.entry(point.series_key.clone()).or_insert_with(|| {
            let mut columns = vec!["time".to_string()];
            columns.extend(point.fields.keys().cloned());
            WireSeries {
                name: point.measurement.clone(),
                tags: point.tags.clone(),
                columns,
                values: Vec::new(),
            }
        });
        let mut row = vec![serde_json::Value::from(point.timestamp_nanos)];
        for column in series.columns.iter().skip(1) {
            row.push(
                point
                    .fields
                    .get(column)
                    .and_then(|v| serde_json::to_value(v).ok())
                    .unwrap_or(serde_json::Value::Null),
            );
        }
        series.values.push(row);
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InMemoryShardExecutor;
    use tsdb_auth::AuthService;
    use tsdb_base::{DataNodeId, Scalar};
    use tsdb_broker::{Broker, LocalBroker};
    use tsdb_meta::catalog::RetentionPolicy;
    use tsdb_meta::log::{Entry, LogRecord};
    use tsdb_write::{InMemoryShardStore, ShardStore, StoredPoint};

    async fn setup() -> (QueryPipeline, Metastore) {
        let broker: Arc<dyn Broker> = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        meta.apply_committed(&Entry {
            index: 1,
            record: LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        })
        .await
        .unwrap();
        meta.apply_committed(&Entry {
            index: 2,
            record: LogRecord::CreateRetentionPolicy {
                database: "db".to_string(),
                policy: RetentionPolicy {
                    name: "default".to_string(),
                    duration_nanos: None,
                    replica_n: 1,
                    shard_group_duration_nanos: 3600_000_000_000,
                },
                set_default: true,
            },
        })
        .await
        .unwrap();
        meta.apply_committed(&Entry {
            index: 3,
            record: LogRecord::AssignDataNode {
                id: DataNodeId(1),
                url: "http://a:8086".to_string(),
            },
        })
        .await
        .unwrap();
        meta.apply_committed(&Entry {
            index: 4,
            record: LogRecord::EnsureMeasurement {
                database: "db".to_string(),
                measurement: "cpu".to_string(),
            },
        })
        .await
        .unwrap();
        meta.apply_committed(&Entry {
            index: 5,
            record: LogRecord::CreateShardGroup {
                database: "db".to_string(),
                policy: "default".to_string(),
                id: tsdb_base::ShardGroupId(1),
                start_nanos: 0,
                end_nanos: 3600_000_000_000,
                shards: vec![(
                    tsdb_base::ShardId(1),
                    [DataNodeId(1)].into_iter().collect(),
                )],
            },
        })
        .await
        .unwrap();

        let store = Arc::new(InMemoryShardStore::new());
        store.write(
            tsdb_base::ShardId(1),
            "cpu\0host=a".to_string(),
            StoredPoint {
                measurement: "cpu".to_string(),
                tags: [("host".to_string(), "a".to_string())].into_iter().collect(),
                timestamp_nanos: 100,
                fields: [("v".to_string(), Scalar::Int(42))].into_iter().collect(),
                write_timestamp_nanos: 100,
            },
        );

        let auth = AuthService::new(broker, meta.clone());
        let executor = Arc::new(InMemoryShardExecutor::new(store));
        (QueryPipeline::new(meta.clone(), auth, executor), meta)
    }

    #[tokio::test]
    async fn returns_series_for_a_known_measurement() {
        let (pipeline, _meta) = setup().await;
        let results = pipeline
            .query(&Principal::Anonymous, "db", "SELECT * FROM cpu")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].error.is_none());
        assert_eq!(results[0].series.len(), 1);
        assert_eq!(results[0].series[0].values.len(), 1);
    }

    #[tokio::test]
    async fn unknown_measurement_reports_error_without_hard_failure() {
        let (pipeline, _meta) = setup().await;
        let results = pipeline
            .query(&Principal::Anonymous, "db", "SELECT * FROM nope")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error.as_deref(), Some("measurement not found"));
    }

    #[tokio::test]
    async fn statement_after_an_error_is_not_executed() {
        let (pipeline, _meta) = setup().await;
        let results = pipeline
            .query(
                &Principal::Anonymous,
                "db",
                "SELECT * FROM nope; SELECT * FROM cpu",
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error.as_deref(), Some("measurement not found"));
        assert_eq!(results[1].error.as_deref(), Some("not executed"));
    }
}
