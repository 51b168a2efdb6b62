//! Write pipeline: normalizes a `BatchPoints` envelope, authorizes,
//! assigns shards via `tsdb-cluster`, writes locally, and replicates to
//! peer owners with hinted handoff for unreachable ones.

pub mod batch;
pub mod coordinator;
pub mod error;
pub mod handoff;
pub mod normalize;
pub mod replica;
pub mod store;

pub use batch::{BatchPoints, WirePoint, WireTimestamp};
pub use coordinator::{WriteAck, WriteCoordinator};
pub use error::WriteError;
pub use normalize::{normalize, NormalizedPoint};
pub use store::{InMemoryShardStore, ShardStore, StoredPoint};
