use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("database is required")]
    DatabaseRequired,
    #[error("database not found")]
    DatabaseNotFound,
    #[error("measurement name is required")]
    MeasurementRequired,
    #[error("point must have at least one field")]
    FieldsRequired,
    #[error("tag and field keys must be disjoint, found {0:?} in both")]
    TagFieldCollision(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("field type conflict for existing field {0:?}")]
    FieldTypeConflict(String),
    #[error("measurement has too many fields")]
    FieldOverflow,
    #[error("insufficient replication: got {got} of {want} required acks")]
    InsufficientReplication { got: usize, want: usize },

    #[error(transparent)]
    Auth(#[from] tsdb_auth::AuthError),
    #[error(transparent)]
    Cluster(#[from] tsdb_cluster::ClusterError),
    #[error("broker unavailable: {0}")]
    Broker(String),
}

impl WriteError {
    /// `DatabaseRequired`/`MeasurementRequired` mirror a required-field
    /// invariant the source treats as fatal rather than as a 400; everything
    /// else follows the ordinary not-found/validation split.
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            WriteError::DatabaseRequired | WriteError::MeasurementRequired => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WriteError::DatabaseNotFound => StatusCode::NOT_FOUND,
            WriteError::FieldsRequired
            | WriteError::TagFieldCollision(_)
            | WriteError::InvalidTimestamp(_)
            | WriteError::FieldTypeConflict(_)
            | WriteError::FieldOverflow => StatusCode::BAD_REQUEST,
            WriteError::Auth(e) => e.status_code(),
            WriteError::Cluster(e) => e.status_code(),
            WriteError::Broker(_) | WriteError::InsufficientReplication { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}
