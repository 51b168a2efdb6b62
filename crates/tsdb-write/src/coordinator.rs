//! Write pipeline: authorize, normalize, route, write locally, fan out
//! to replicas, and acknowledge once `W` owners have the point.

use crate::batch::BatchPoints;
use crate::error::WriteError;
use crate::handoff::HintedHandoffQueue;
use crate::normalize::{self, NormalizedPoint};
use crate::replica::ReplicaTransport;
use crate::store::{ShardStore, StoredPoint};
use std::sync::Arc;
use tsdb_auth::{AuthService, Principal};
use tsdb_base::series_key::canonical_key;
use tsdb_base::{now_nanos, DataNodeId, ShardId};
use tsdb_broker::Broker;
use tsdb_cluster::{DataNodeRegistry, ShardRouter};
use tsdb_meta::log::LogRecord;
use tsdb_meta::{MetaError, Metastore};

pub struct WriteAck {
    pub points_written: usize,
}

pub struct WriteCoordinator {
    broker: Arc<dyn Broker>,
    meta: Metastore,
    auth: AuthService,
    router: ShardRouter,
    registry: DataNodeRegistry,
    store: Arc<dyn ShardStore>,
    transport: Arc<dyn ReplicaTransport>,
    handoff: Arc<HintedHandoffQueue>,
    local_node_id: DataNodeId,
    ack_w: usize,
}

impl WriteCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker: Arc<dyn Broker>,
        meta: Metastore,
        auth: AuthService,
        router: ShardRouter,
        registry: DataNodeRegistry,
        store: Arc<dyn ShardStore>,
        transport: Arc<dyn ReplicaTransport>,
        local_node_id: DataNodeId,
        ack_w: usize,
    ) -> Self {
        Self {
            handoff: Arc::new(HintedHandoffQueue::new(transport.clone())),
            broker,
            meta,
            auth,
            router,
            registry,
            store,
            transport,
            local_node_id,
            ack_w: ack_w.max(1),
        }
    }

    pub async fn write(
        &self,
        principal: &Principal,
        batch: BatchPoints,
    ) -> Result<WriteAck, WriteError> {
        if batch.database.is_empty() {
            return Err(WriteError::DatabaseRequired);
        }
        self.auth
            .authorize_write(principal, &batch.database)
            .await?;
        self.write_unchecked(batch).await
    }

    /// Writes a batch without an authorization check. Used by the
    /// continuous-query runner, which is a trusted internal caller
    /// rather than an HTTP-facing principal.
    pub async fn write_system(&self, batch: BatchPoints) -> Result<WriteAck, WriteError> {
        self.write_unchecked(batch).await
    }

    async fn write_unchecked(&self, batch: BatchPoints) -> Result<WriteAck, WriteError> {
        if batch.database.is_empty() {
            return Err(WriteError::DatabaseRequired);
        }
        let snapshot = self.meta.snapshot().await;
        if !snapshot.databases.contains_key(&batch.database) {
            return Err(WriteError::DatabaseNotFound);
        }

        let database = batch.database.clone();
        let policy = batch.retention_policy.clone();
        let points = normalize::normalize(batch)?;

        for point in &points {
            self.check_and_observe_schema(&database, point).await?;
            self.write_one(&database, &policy, point).await?;
        }

        Ok(WriteAck {
            points_written: points.len(),
        })
    }

    async fn check_and_observe_schema(
        &self,
        database: &str,
        point: &NormalizedPoint,
    ) -> Result<(), WriteError> {
        let snapshot = self.meta.snapshot().await;
        let existing = snapshot
            .databases
            .get(database)
            .and_then(|db| db.measurements.get(&point.measurement));

        let mut new_fields = Vec::new();
        for (name, value) in &point.fields {
            let kind = value.kind();
            match existing.and_then(|m| m.fields.get(name)) {
                Some(existing_kind) if *existing_kind != kind => {
                    return Err(WriteError::FieldTypeConflict(name.clone()));
                }
                Some(_) => {}
                None => {
                    let at_capacity = existing
                        .map(|m| m.fields.len() >= tsdb_meta::catalog::MAX_FIELDS_PER_MEASUREMENT)
                        .unwrap_or(false);
                    if at_capacity {
                        return Err(WriteError::FieldOverflow);
                    }
                    new_fields.push((name.clone(), kind));
                }
            }
        }

        if existing.is_none() {
            self.propose(LogRecord::EnsureMeasurement {
                database: database.to_string(),
                measurement: point.measurement.clone(),
            })
            .await?;
        }
        if !new_fields.is_empty() {
            self.propose(LogRecord::ObserveFields {
                database: database.to_string(),
                measurement: point.measurement.clone(),
                fields: new_fields,
            })
            .await?;
        }
        Ok(())
    }

    async fn propose(&self, record: LogRecord) -> Result<(), WriteError> {
        self.meta
            .validate(&record)
            .await
            .map_err(write_error_from_meta)?;
        let index = self
            .broker
            .propose(record)
            .await
            .map_err(|e| WriteError::Broker(e.to_string()))?;
        self.meta.wait_for_index(index).await;
        Ok(())
    }

    async fn write_one(
        &self,
        database: &str,
        policy: &str,
        point: &NormalizedPoint,
    ) -> Result<(), WriteError> {
        let series_key = canonical_key(&point.measurement, &point.tags);
        let placement = self
            .router
            .route(database, policy, &series_key, point.timestamp_nanos)
            .await?;

        let stored = StoredPoint {
            measurement: point.measurement.clone(),
            tags: point.tags.clone(),
            timestamp_nanos: point.timestamp_nanos,
            fields: point.fields.clone(),
            write_timestamp_nanos: now_nanos(),
        };

        let mut acks = 0usize;
        let mut remaining: Vec<DataNodeId> = Vec::new();
        for owner in &placement.owners {
            if *owner == self.local_node_id {
                self.store.write(placement.shard, series_key.clone(), stored.clone());
                acks += 1;
            } else {
                remaining.push(*owner);
            }
        }

        for owner in remaining {
            if acks >= self.ack_w {
                self.defer_to_handoff(owner, placement.shard, &series_key, stored.clone())
                    .await;
                continue;
            }
            let Some(node) = self.registry.by_id(owner).await else {
                continue;
            };
            match self
                .transport
                .replicate(&node.url, placement.shard, &series_key, stored.clone())
                .await
            {
                Ok(()) => acks += 1,
                Err(_) => {
                    self.defer_to_handoff(owner, placement.shard, &series_key, stored.clone())
                        .await;
                }
            }
        }

        if acks < self.ack_w {
            return Err(WriteError::InsufficientReplication {
                got: acks,
                want: self.ack_w,
            });
        }

        Ok(())
    }

    /// Accepts a point this node is a replica owner for, delivered by a
    /// peer coordinator's [`ReplicaTransport`] (or its hinted-handoff
    /// drainer). The receiving half of `/internal/replicate`.
    pub fn receive_replicated(&self, shard: ShardId, series_key: String, point: StoredPoint) {
        self.store.write(shard, series_key, point);
    }

    async fn defer_to_handoff(
        &self,
        owner: DataNodeId,
        shard: ShardId,
        series_key: &str,
        point: StoredPoint,
    ) {
        if let Some(node) = self.registry.by_id(owner).await {
            self.handoff
                .enqueue(owner, node.url, shard, series_key.to_string(), point)
                .await;
        }
    }
}

fn write_error_from_meta(e: MetaError) -> WriteError {
    match e {
        MetaError::FieldTypeConflict => WriteError::FieldTypeConflict(String::new()),
        MetaError::FieldOverflow => WriteError::FieldOverflow,
        MetaError::DatabaseNotFound => WriteError::DatabaseNotFound,
        other => WriteError::InvalidTimestamp(other.to_string()),
    }
}
