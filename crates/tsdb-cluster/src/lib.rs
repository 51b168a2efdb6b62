//! Data-node membership and the shard router, wired to a
//! [`tsdb_broker::Broker`] and a [`tsdb_meta::Metastore`].

pub mod error;
pub mod registry;
pub mod router;

pub use error::ClusterError;
pub use registry::DataNodeRegistry;
pub use router::{Placement, ShardRouter};
