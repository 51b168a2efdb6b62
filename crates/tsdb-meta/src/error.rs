//! Metastore error taxonomy, following the stable-string-sentinel design
//! note: each variant's `Display` is the wire message, and no two variants
//! share one.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("database name is required")]
    DatabaseNameRequired,
    #[error("database already exists")]
    DatabaseExists,
    #[error("database not found")]
    DatabaseNotFound,

    #[error("retention policy name is required")]
    RetentionPolicyNameRequired,
    #[error("retention policy already exists")]
    RetentionPolicyExists,
    #[error("retention policy not found")]
    RetentionPolicyNotFound,
    #[error("default retention policy not found")]
    DefaultRetentionPolicyNotFound,
    #[error("replication factor must be at least 1")]
    InvalidReplicaN,

    #[error("user name is required")]
    UserNameRequired,
    #[error("invalid user name")]
    InvalidUserName,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,

    #[error("continuous query already exists")]
    ContinuousQueryExists,
    #[error("continuous query not found")]
    ContinuousQueryNotFound,
    #[error("continuous query lease is held by another node")]
    LeaseHeld,

    #[error("data node url is required")]
    DataNodeURLRequired,
    #[error("data node already exists")]
    DataNodeExists,
    #[error("data node not found")]
    DataNodeNotFound,

    #[error("measurement name is required")]
    MeasurementNameRequired,
    #[error("measurement not found")]
    MeasurementNotFound,
    #[error("field type conflict for existing field")]
    FieldTypeConflict,
    #[error("measurement has too many fields")]
    FieldOverflow,

    #[error("series already exists")]
    SeriesExists,

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    UnsupportedSnapshotVersion { found: u32, expected: u32 },
    #[error("failed to decode metastore snapshot: {0}")]
    SnapshotDecode(String),

    #[error("broker unavailable: {0}")]
    Broker(String),
}

impl MetaError {
    /// Status the HTTP surface reports for this error, per the not-found /
    /// already-exists / validation taxonomy.
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            MetaError::DatabaseNotFound
            | MetaError::RetentionPolicyNotFound
            | MetaError::UserNotFound
            | MetaError::ContinuousQueryNotFound
            | MetaError::DataNodeNotFound
            | MetaError::MeasurementNotFound => StatusCode::NOT_FOUND,

            MetaError::DatabaseExists
            | MetaError::RetentionPolicyExists
            | MetaError::UserExists
            | MetaError::ContinuousQueryExists
            | MetaError::DataNodeExists
            | MetaError::SeriesExists
            | MetaError::LeaseHeld => StatusCode::CONFLICT,

            MetaError::DatabaseNameRequired
            | MetaError::RetentionPolicyNameRequired
            | MetaError::DefaultRetentionPolicyNotFound
            | MetaError::InvalidReplicaN
            | MetaError::UserNameRequired
            | MetaError::InvalidUserName
            | MetaError::DataNodeURLRequired
            | MetaError::MeasurementNameRequired
            | MetaError::FieldTypeConflict
            | MetaError::FieldOverflow => StatusCode::BAD_REQUEST,

            MetaError::UnsupportedSnapshotVersion { .. } | MetaError::SnapshotDecode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            MetaError::Broker(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
