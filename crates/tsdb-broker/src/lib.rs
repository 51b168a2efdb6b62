//! The consensus layer that orders metadata proposals.
//!
//! `Broker` is modeled as an async trait with two implementations:
//! [`local::LocalBroker`], a single-node "consensus" that is trivially its
//! own leader, and [`remote::RemoteBroker`], an HTTP client stub that
//! exercises the leader-redirect contract against a peer broker without a
//! real multi-node Raft/gossip implementation (out of scope per the
//! purpose/scope section).

pub mod apply;
pub mod error;
pub mod local;
pub mod remote;

pub use apply::spawn_apply_loop;
pub use error::BrokerError;
pub use local::LocalBroker;
pub use remote::RemoteBroker;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tsdb_meta::log::{Entry, LogRecord};

/// Submits proposals to, and streams committed entries from, the cluster's
/// consensus log.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Submits a proposal. Resolves once the record is durably committed
    /// and returns its log index; the caller still has to wait for its own
    /// local metastore to apply that index (see `tsdb-meta::Metastore::
    /// wait_for_index`) before the mutation is locally observable.
    async fn propose(&self, record: LogRecord) -> Result<u64, BrokerError>;

    /// A restartable stream of committed entries starting at `start_index`
    /// (inclusive). Consumers checkpoint the last applied index and resume
    /// from there after a restart.
    fn stream(&self, start_index: u64) -> BoxStream<'static, Entry>;
}
