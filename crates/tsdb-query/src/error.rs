use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("database is required")]
    DatabaseRequired,
    #[error("database not found")]
    DatabaseNotFound,
    #[error("measurement not found")]
    MeasurementNotFound,
    #[error("failed to parse query: {0}")]
    Parse(String),
    #[error("not executed")]
    NotExecuted,

    #[error(transparent)]
    Auth(#[from] tsdb_auth::AuthError),
    #[error(transparent)]
    Meta(#[from] tsdb_meta::MetaError),
}

impl QueryError {
    /// Mirrors [`tsdb_write::WriteError::status_code`]'s required-field
    /// convention: `DatabaseRequired` is the `?db=` param being absent
    /// entirely, not a validation failure on its contents.
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            QueryError::DatabaseRequired | QueryError::NotExecuted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            QueryError::DatabaseNotFound | QueryError::MeasurementNotFound => {
                StatusCode::NOT_FOUND
            }
            QueryError::Parse(_) => StatusCode::BAD_REQUEST,
            QueryError::Auth(e) => e.status_code(),
            QueryError::Meta(e) => e.status_code(),
        }
    }
}
