//! The query parser/execution engine is out of scope; this
//! trait is the seam a real storage/execution engine would implement.
//! [`InMemoryShardExecutor`] is backed by the same [`tsdb_write::ShardStore`]
//! the write pipeline writes into — enough to thread a statement through
//! shard resolution, dispatch and merge, and to exercise the LWW and
//! ordering invariants without claiming to be a real execution engine.

use crate::error::QueryError;
use crate::statement::Statement;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tsdb_base::{Scalar, ShardId};
use tsdb_write::ShardStore;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub series_key: String,
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub timestamp_nanos: i64,
    pub fields: BTreeMap<String, Scalar>,
}

#[async_trait]
pub trait ShardExecutor: Send + Sync {
    async fn execute(
        &self,
        shard: ShardId,
        stmt: &Statement,
    ) -> Result<Vec<SeriesPoint>, QueryError>;
}

pub struct InMemoryShardExecutor {
    store: Arc<dyn ShardStore>,
}

impl InMemoryShardExecutor {
    pub fn new(store: Arc<dyn ShardStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ShardExecutor for InMemoryShardExecutor {
    async fn execute(
        &self,
        shard: ShardId,
        stmt: &Statement,
    ) -> Result<Vec<SeriesPoint>, QueryError> {
        let Statement::Select {
            measurement,
            time_range,
        } = stmt;

        let rows = self
            .store
            .read(shard)
            .into_iter()
            .filter(|p| &p.measurement == measurement)
            .filter(|p| {
                time_range
                    .as_ref()
                    .map_or(true, |r| r.contains(p.timestamp_nanos))
            })
            .map(|p| SeriesPoint {
                series_key: tsdb_base::series_key::canonical_key(&p.measurement, &p.tags),
                measurement: p.measurement,
                tags: p.tags,
                timestamp_nanos: p.timestamp_nanos,
                fields: p.fields,
            })
            .collect();
        Ok(rows)
    }
}
