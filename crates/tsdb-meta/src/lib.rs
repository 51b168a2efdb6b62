//! The replicated cluster catalog: databases, retention policies,
//! measurements, series, users, continuous queries, data nodes, shards and
//! shard groups.
//!
//! The metastore is a deterministic state machine driven by an ordered log
//! of [`LogRecord`]s (see [`log`]). [`Metastore`] is the read/apply façade
//! used by the rest of the workspace; applying a record is idempotent so
//! that replaying the log from index 0 on startup is safe.

pub mod catalog;
pub mod error;
pub mod log;
pub mod snapshot;
pub mod store;

pub use catalog::*;
pub use error::MetaError;
pub use log::LogRecord;
pub use store::Metastore;
