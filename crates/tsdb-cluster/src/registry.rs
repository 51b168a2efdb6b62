//! Data-node membership: a thin proposal/apply wrapper around the
//! metastore's `AssignDataNode`/`RemoveDataNode` records.

use crate::error::ClusterError;
use std::sync::Arc;
use tsdb_base::DataNodeId;
use tsdb_broker::Broker;
use tsdb_meta::catalog::{DataNode, DataNodeStatus};
use tsdb_meta::log::LogRecord;
use tsdb_meta::Metastore;

#[derive(Clone)]
pub struct DataNodeRegistry {
    broker: Arc<dyn Broker>,
    meta: Metastore,
}

impl DataNodeRegistry {
    pub fn new(broker: Arc<dyn Broker>, meta: Metastore) -> Self {
        Self { broker, meta }
    }

    pub async fn all(&self) -> Vec<DataNode> {
        self.meta
            .snapshot()
            .await
            .data_nodes
            .into_values()
            .filter(|n| n.status == DataNodeStatus::Live)
            .collect()
    }

    pub async fn by_id(&self, id: DataNodeId) -> Option<DataNode> {
        self.meta.snapshot().await.data_nodes.get(&id).cloned()
    }

    pub async fn by_url(&self, url: &str) -> Option<DataNode> {
        self.meta
            .snapshot()
            .await
            .data_nodes
            .values()
            .find(|n| n.url == url)
            .cloned()
    }

    /// Registers a new data node. The id is assigned by the metastore's
    /// monotonic counter and never reused, even for a node later removed.
    pub async fn register(&self, url: String) -> Result<DataNode, ClusterError> {
        let next_id = {
            let snapshot = self.meta.snapshot().await;
            DataNodeId(snapshot.next_data_node_id)
        };
        let record = LogRecord::AssignDataNode {
            id: next_id,
            url: url.clone(),
        };
        self.meta.validate(&record).await?;
        let index = self
            .broker
            .propose(record)
            .await
            .map_err(|e| ClusterError::Broker(e.to_string()))?;
        self.meta.wait_for_index(index).await;
        Ok(DataNode {
            id: next_id,
            url,
            status: DataNodeStatus::Live,
        })
    }

    pub async fn unregister(&self, id: DataNodeId) -> Result<(), ClusterError> {
        let record = LogRecord::RemoveDataNode { id };
        self.meta.validate(&record).await?;
        let index = self
            .broker
            .propose(record)
            .await
            .map_err(|e| ClusterError::Broker(e.to_string()))?;
        self.meta.wait_for_index(index).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsdb_broker::LocalBroker;

    fn registry() -> DataNodeRegistry {
        let broker: Arc<dyn Broker> = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        tsdb_broker::spawn_apply_loop(broker.clone(), meta.clone());
        DataNodeRegistry::new(broker, meta)
    }

    #[tokio::test]
    async fn register_assigns_increasing_ids() {
        let reg = registry();
        let a = reg.register("http://a:8086".to_string()).await.unwrap();
        let b = reg.register("http://b:8086".to_string()).await.unwrap();
        assert_eq!(a.id, DataNodeId(1));
        assert_eq!(b.id, DataNodeId(2));
    }

    #[tokio::test]
    async fn duplicate_url_is_rejected() {
        let reg = registry();
        reg.register("http://a:8086".to_string()).await.unwrap();
        let err = reg.register("http://a:8086".to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterError::Meta(tsdb_meta::MetaError::DataNodeExists)
        ));
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_removal() {
        let reg = registry();
        let a = reg.register("http://a:8086".to_string()).await.unwrap();
        reg.unregister(a.id).await.unwrap();
        let b = reg.register("http://b:8086".to_string()).await.unwrap();
        assert_eq!(b.id, DataNodeId(2));
    }
}
