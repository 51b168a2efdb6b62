//! Hinted handoff: a deferred replication queue used when a write's target
//! owner is unreachable. One queue per target node, a single
//! writer (the coordinator, enqueuing failed replicas) and a single
//! drainer (a retry task with exponential backoff 100ms -> 30s cap).

use crate::replica::ReplicaTransport;
use crate::store::StoredPoint;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tsdb_base::{DataNodeId, ShardId};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const QUEUE_CAPACITY: usize = 4096;

struct HandoffItem {
    peer_url: String,
    shard: ShardId,
    series_key: String,
    point: StoredPoint,
}

/// Owns one bounded queue + drain task per target node, lazily created on
/// first enqueue.
pub struct HintedHandoffQueue {
    transport: std::sync::Arc<dyn ReplicaTransport>,
    senders: Mutex<HashMap<DataNodeId, mpsc::Sender<HandoffItem>>>,
}

impl HintedHandoffQueue {
    pub fn new(transport: std::sync::Arc<dyn ReplicaTransport>) -> Self {
        Self {
            transport,
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Defers delivery of `point` to `node` at `peer_url`. Never blocks the
    /// write path on the retry loop: if the bounded queue for this node is
    /// full, the oldest hint is effectively capped out and this call
    /// applies backpressure by awaiting a free slot, matching "single
    /// writer per target node".
    pub async fn enqueue(
        &self,
        node: DataNodeId,
        peer_url: String,
        shard: ShardId,
        series_key: String,
        point: StoredPoint,
    ) {
        let sender = self.sender_for(node, peer_url.clone());
        let item = HandoffItem {
            peer_url,
            shard,
            series_key,
            point,
        };
        if sender.send(item).await.is_err() {
            tracing::error!(node = node.0, "hinted-handoff drainer task died; dropping hint");
        }
    }

    fn sender_for(&self, node: DataNodeId, peer_url: String) -> mpsc::Sender<HandoffItem> {
        let mut senders = self.senders.lock().unwrap();
        if let Some(sender) = senders.get(&node) {
            return sender.clone();
        }
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        senders.insert(node, tx.clone());
        tokio::spawn(drain(node, rx, self.transport.clone()));
        tx
    }
}

async fn drain(
    node: DataNodeId,
    mut rx: mpsc::Receiver<HandoffItem>,
    transport: std::sync::Arc<dyn ReplicaTransport>,
) {
    while let Some(item) = rx.recv().await {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match transport
                .replicate(&item.peer_url, item.shard, &item.series_key, item.point.clone())
                .await
            {
                Ok(()) => break,
                Err(err) => {
                    tracing::warn!(
                        node = node.0,
                        %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "hinted-handoff delivery failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyTransport {
        fail_times: AtomicUsize,
        delivered: Arc<std::sync::Mutex<Vec<StoredPoint>>>,
    }

    #[async_trait]
    impl ReplicaTransport for FlakyTransport {
        async fn replicate(
            &self,
            _peer_url: &str,
            _shard: ShardId,
            _series_key: &str,
            point: StoredPoint,
        ) -> Result<(), crate::replica::ReplicationError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(crate::replica::ReplicationError {
                    url: "peer".to_string(),
                    message: "simulated failure".to_string(),
                });
            }
            self.delivered.lock().unwrap().push(point);
            Ok(())
        }
    }

    #[tokio::test]
    async fn retries_until_delivered() {
        let delivered = Arc::new(std::sync::Mutex::new(Vec::new()));
        let transport = Arc::new(FlakyTransport {
            fail_times: AtomicUsize::new(2),
            delivered: delivered.clone(),
        });
        let queue = HintedHandoffQueue::new(transport);

        let point = StoredPoint {
            measurement: "cpu".to_string(),
            tags: Default::default(),
            timestamp_nanos: 1,
            fields: Default::default(),
            write_timestamp_nanos: 1,
        };
        queue
            .enqueue(
                DataNodeId(1),
                "http://peer:8086".to_string(),
                ShardId(1),
                "cpu".to_string(),
                point,
            )
            .await;

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !delivered.lock().unwrap().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(delivered.lock().unwrap().len(), 1);
    }
}
