use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error(transparent)]
    Meta(#[from] tsdb_meta::MetaError),

    #[error("retention exceeded")]
    RetentionExceeded,
    #[error("timestamp is too far in the future")]
    FutureWriteSkew,
    #[error("no live data nodes available")]
    NoLiveDataNodes,
    #[error("broker unavailable: {0}")]
    Broker(String),
}

impl ClusterError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            ClusterError::Meta(e) => e.status_code(),
            ClusterError::RetentionExceeded | ClusterError::FutureWriteSkew => {
                StatusCode::BAD_REQUEST
            }
            ClusterError::NoLiveDataNodes | ClusterError::Broker(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
