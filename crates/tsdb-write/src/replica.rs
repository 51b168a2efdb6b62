//! Transport for replicating a single point write to a peer data node.
//! Modeled as a trait so the coordinator and the hinted-handoff drainer
//! don't care whether the peer is reached over HTTP or, in tests, an
//! in-process stand-in.

use crate::store::StoredPoint;
use async_trait::async_trait;
use tsdb_base::ShardId;

#[derive(Debug, thiserror::Error)]
#[error("replication to {url} failed: {message}")]
pub struct ReplicationError {
    pub url: String,
    pub message: String,
}

#[async_trait]
pub trait ReplicaTransport: Send + Sync {
    async fn replicate(
        &self,
        peer_url: &str,
        shard: ShardId,
        series_key: &str,
        point: StoredPoint,
    ) -> Result<(), ReplicationError>;
}

/// Ships a point to a peer's internal replicate endpoint over HTTP/JSON,
/// matching this system's inter-node RPC being HTTP rather than gRPC.
pub struct HttpReplicaTransport {
    client: reqwest::Client,
}

impl HttpReplicaTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpReplicaTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(serde::Serialize)]
struct ReplicateBody<'a> {
    shard: u64,
    series_key: &'a str,
    point: &'a StoredPoint,
}

#[async_trait]
impl ReplicaTransport for HttpReplicaTransport {
    async fn replicate(
        &self,
        peer_url: &str,
        shard: ShardId,
        series_key: &str,
        point: StoredPoint,
    ) -> Result<(), ReplicationError> {
        let url = format!("{peer_url}/internal/replicate");
        let body = ReplicateBody {
            shard: shard.0,
            series_key,
            point: &point,
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReplicationError {
                url: peer_url.to_string(),
                message: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(ReplicationError {
                url: peer_url.to_string(),
                message: format!("peer returned status {}", resp.status()),
            });
        }
        Ok(())
    }
}
