use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tsdb_auth::{AuthService, Principal};
use tsdb_base::{DataNodeId, Scalar, ShardId};
use tsdb_broker::{Broker, LocalBroker};
use tsdb_cluster::{DataNodeRegistry, ShardRouter};
use tsdb_meta::catalog::RetentionPolicy;
use tsdb_meta::log::LogRecord;
use tsdb_meta::Metastore;
use tsdb_write::replica::{ReplicaTransport, ReplicationError};
use tsdb_write::store::{InMemoryShardStore, ShardStore, StoredPoint};
use tsdb_write::{BatchPoints, WirePoint, WriteCoordinator, WriteError};

struct CountingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl ReplicaTransport for CountingTransport {
    async fn replicate(
        &self,
        _peer_url: &str,
        _shard: ShardId,
        _series_key: &str,
        _point: StoredPoint,
    ) -> Result<(), ReplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingTransport;

#[async_trait]
impl ReplicaTransport for FailingTransport {
    async fn replicate(
        &self,
        peer_url: &str,
        _shard: ShardId,
        _series_key: &str,
        _point: StoredPoint,
    ) -> Result<(), ReplicationError> {
        Err(ReplicationError {
            url: peer_url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

async fn propose_and_wait(broker: &dyn Broker, meta: &Metastore, record: LogRecord) {
    let index = broker.propose(record).await.unwrap();
    meta.wait_for_index(index).await;
}

async fn setup_single_node() -> (WriteCoordinator, Arc<InMemoryShardStore>, Metastore) {
    let broker: Arc<dyn Broker> = Arc::new(LocalBroker::new());
    let meta = Metastore::new();
    tsdb_broker::spawn_apply_loop(broker.clone(), meta.clone());
    propose_and_wait(
        &*broker,
        &meta,
        LogRecord::CreateDatabase {
            name: "metrics".to_string(),
        },
    )
    .await;
    propose_and_wait(
        &*broker,
        &meta,
        LogRecord::CreateRetentionPolicy {
            database: "metrics".to_string(),
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
            id: DataNodeId(1),
            url: "http://local:8086".to_string(),
        },
    )
    .await;

    let auth = AuthService::new(broker.clone(), meta.clone());
    let router = ShardRouter::new(broker.clone(), meta.clone());
    let registry = DataNodeRegistry::new(broker.clone(), meta.clone());
    let store: Arc<InMemoryShardStore> = Arc::new(InMemoryShardStore::new());
    let transport = Arc::new(CountingTransport {
        calls: AtomicUsize::new(0),
    });

    let coordinator = WriteCoordinator::new(
        broker,
        meta.clone(),
        auth,
        router,
        registry,
        store.clone(),
        transport,
        DataNodeId(1),
        1,
    );
    (coordinator, store, meta)
}

fn batch() -> BatchPoints {
    BatchPoints {
        database: "metrics".to_string(),
        retention_policy: String::new(),
        tags: BTreeMap::from([("host".to_string(), "a".to_string())]),
        timestamp: Some(tsdb_write::WireTimestamp::Epoch(1_700_000_000)),
        precision: Some("s".to_string()),
        points: vec![WirePoint {
            name: "cpu".to_string(),
            tags: BTreeMap::new(),
            timestamp: None,
            precision: None,
            values: BTreeMap::from([("v".to_string(), Scalar::Int(1))]),
        }],
    }
}

#[tokio::test]
async fn write_lands_in_the_local_shard_store() {
    let (coordinator, store, _meta) = setup_single_node().await;
    let ack = coordinator
        .write(&Principal::Anonymous, batch())
        .await
        .unwrap();
    assert_eq!(ack.points_written, 1);

    let points = store.read(ShardId(1));
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].tags.get("host"), Some(&"a".to_string()));
    assert_eq!(points[0].timestamp_nanos, 1_700_000_000_000_000_000);
}

#[tokio::test]
async fn second_write_to_same_series_and_timestamp_is_last_write_wins() {
    let (coordinator, store, _meta) = setup_single_node().await;
    let mut first = batch();
    first.points[0].values.insert("v".to_string(), Scalar::Int(1));
    coordinator.write(&Principal::Anonymous, first).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let mut second = batch();
    second.points[0].values.insert("v".to_string(), Scalar::Int(2));
    coordinator.write(&Principal::Anonymous, second).await.unwrap();

    let points = store.read(ShardId(1));
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].fields.get("v"), Some(&Scalar::Int(2)));
}

#[tokio::test]
async fn conflicting_field_type_is_rejected() {
    let (coordinator, _store, _meta) = setup_single_node().await;
    coordinator.write(&Principal::Anonymous, batch()).await.unwrap();

    let mut conflicting = batch();
    conflicting.points[0]
        .values
        .insert("v".to_string(), Scalar::Str("oops".to_string()));
    let err = coordinator
        .write(&Principal::Anonymous, conflicting)
        .await
        .unwrap_err();
    assert!(matches!(err, WriteError::FieldTypeConflict(_)));
}

#[tokio::test]
async fn unknown_database_is_rejected() {
    let (coordinator, _store, _meta) = setup_single_node().await;
    let mut b = batch();
    b.database = "nope".to_string();
    let err = coordinator
        .write(&Principal::Anonymous, b)
        .await
        .unwrap_err();
    assert_eq!(err, WriteError::DatabaseNotFound);
}

#[tokio::test]
async fn write_fails_when_fewer_than_w_owners_acknowledge() {
    // Two live owners, neither of them the coordinator itself, both
    // unreachable: the write must not report success having durably
    // landed nowhere.
    let broker: Arc<dyn Broker> = Arc::new(LocalBroker::new());
    let meta = Metastore::new();
    tsdb_broker::spawn_apply_loop(broker.clone(), meta.clone());
    propose_and_wait(
        &*broker,
        &meta,
        LogRecord::CreateDatabase {
            name: "metrics".to_string(),
        },
    )
    .await;
    propose_and_wait(
        &*broker,
        &meta,
        LogRecord::CreateRetentionPolicy {
            database: "metrics".to_string(),
            policy: RetentionPolicy {
                name: "default".to_string(),
                duration_nanos: None,
                replica_n: 2,
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
            id: DataNodeId(1),
            url: "http://a:8086".to_string(),
        },
    )
    .await;
    propose_and_wait(
        &*broker,
        &meta,
        LogRecord::AssignDataNode {
            id: DataNodeId(2),
            url: "http://b:8086".to_string(),
        },
    )
    .await;

    let auth = AuthService::new(broker.clone(), meta.clone());
    let router = ShardRouter::new(broker.clone(), meta.clone());
    let registry = DataNodeRegistry::new(broker.clone(), meta.clone());
    let store: Arc<InMemoryShardStore> = Arc::new(InMemoryShardStore::new());

    let coordinator = WriteCoordinator::new(
        broker,
        meta,
        auth,
        router,
        registry,
        store,
        Arc::new(FailingTransport),
        DataNodeId(99), // not one of the two replica owners
        1,
    );

    let err = coordinator
        .write(&Principal::Anonymous, batch())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WriteError::InsufficientReplication { got: 0, want: 1 }
    ));
}
