//! Query pipeline: statement parsing, per-database authorization,
//! shard dispatch, and a deterministic merge of shard sub-query results.
//!
//! The query parser/execution engine proper is out of scope; see
//! [`executor::ShardExecutor`] for the seam a real one would implement and
//! [`statement`] for the minimal grammar this workspace ships instead.

pub mod error;
pub mod executor;
pub mod merge;
pub mod pipeline;
pub mod statement;

pub use error::QueryError;
pub use executor::{InMemoryShardExecutor, SeriesPoint, ShardExecutor};
pub use pipeline::{QueryPipeline, StatementResult, WireSeries};
pub use statement::{parse_statements, Statement, TimeRange};
