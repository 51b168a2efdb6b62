//! The in-memory stand-in for the on-disk shard storage engine (out of
//! scope per the purpose/scope section). [`ShardStore`] is the seam a real
//! engine would plug into; [`InMemoryShardStore`] is enough to exercise the
//! write/query pipeline end-to-end, including last-write-wins conflict
//! resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tsdb_base::{Scalar, ShardId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub timestamp_nanos: i64,
    pub fields: BTreeMap<String, Scalar>,
    /// The wall-clock write time used to break ties between two deliveries
    /// of the same (series, timestamp, field): last-write-wins by this
    /// value, not by arrival order.
    pub write_timestamp_nanos: i64,
}

pub trait ShardStore: Send + Sync {
    /// Writes `point` into `shard`. Idempotent under duplicate delivery:
    /// the same (series key, timestamp) pair with a lower or equal
    /// `write_timestamp_nanos` than what's already stored is dropped.
    fn write(&self, shard: ShardId, series_key: String, point: StoredPoint);

    fn read(&self, shard: ShardId) -> Vec<StoredPoint>;
}

#[derive(Default)]
pub struct InMemoryShardStore {
    // Keyed by (series_key, timestamp) within each shard so a duplicate
    // delivery replaces rather than appends.
    shards: Mutex<BTreeMap<ShardId, BTreeMap<(String, i64), StoredPoint>>>,
}

impl InMemoryShardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShardStore for InMemoryShardStore {
    fn write(&self, shard: ShardId, series_key: String, point: StoredPoint) {
        let mut shards = self.shards.lock().unwrap();
        let series = shards.entry(shard).or_default();
        let key = (series_key, point.timestamp_nanos);
        match series.get(&key) {
            Some(existing) if existing.write_timestamp_nanos > point.write_timestamp_nanos => {
                // A later write already landed with a higher write
                // timestamp; this (presumably replayed/handed-off)
                // delivery loses.
            }
            _ => {
                series.insert(key, point);
            }
        }
    }

    fn read(&self, shard: ShardId) -> Vec<StoredPoint> {
        self.shards
            .lock()
            .unwrap()
            .get(&shard)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default()
    }
}
