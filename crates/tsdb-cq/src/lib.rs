//! Continuous query runner: periodically materializes each CQ's
//! source query into its target measurement, coordinating across nodes
//! with a metastore-held lease so only one node runs a given CQ's tick.

pub mod error;
pub mod runner;

pub use error::CqError;
pub use runner::{ContinuousQueryRunner, LEASE_NANOS};
