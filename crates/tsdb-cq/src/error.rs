use thiserror::Error;

#[derive(Debug, Error)]
pub enum CqError {
    #[error(transparent)]
    Meta(#[from] tsdb_meta::MetaError),
    #[error(transparent)]
    Query(#[from] tsdb_query::QueryError),
    #[error(transparent)]
    Write(#[from] tsdb_write::WriteError),
    #[error("broker error: {0}")]
    Broker(String),
}
