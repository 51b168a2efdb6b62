//! Shared handler state, the HTTP analogue of the other components'
//! constructors: every route handler gets a cheap [`Clone`] of this rather
//! than reaching for a global.

use std::sync::Arc;
use tsdb_auth::AuthService;
use tsdb_base::DataNodeId;
use tsdb_broker::Broker;
use tsdb_cluster::DataNodeRegistry;
use tsdb_cq::ContinuousQueryRunner;
use tsdb_meta::Metastore;
use tsdb_query::QueryPipeline;
use tsdb_write::WriteCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub meta: Metastore,
    pub broker: Arc<dyn Broker>,
    pub auth: AuthService,
    pub registry: DataNodeRegistry,
    pub writer: Arc<WriteCoordinator>,
    pub query: Arc<QueryPipeline>,
    pub cq_runner: Arc<ContinuousQueryRunner>,
    pub local_node_id: DataNodeId,
    pub auth_enabled: bool,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: Metastore,
        broker: Arc<dyn Broker>,
        auth: AuthService,
        registry: DataNodeRegistry,
        writer: Arc<WriteCoordinator>,
        query: Arc<QueryPipeline>,
        cq_runner: Arc<ContinuousQueryRunner>,
        local_node_id: DataNodeId,
        auth_enabled: bool,
    ) -> Self {
        Self {
            meta,
            broker,
            auth,
            registry,
            writer,
            query,
            cq_runner,
            local_node_id,
            auth_enabled,
        }
    }
}
