//! Maps each component crate's error taxonomy to an HTTP status, following
//! `status_code(&self)` methods the component crates expose rather than
//! re-deriving the mapping here. Mirrors a status-match-then-JSON-body
//! shape, generalized to this system's flat `{"error": "..."}` wire format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Write(#[from] tsdb_write::WriteError),
    #[error(transparent)]
    Query(#[from] tsdb_query::QueryError),
    #[error(transparent)]
    Auth(#[from] tsdb_auth::AuthError),
    #[error(transparent)]
    Cluster(#[from] tsdb_cluster::ClusterError),
    #[error(transparent)]
    Meta(#[from] tsdb_meta::MetaError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Write(e) => e.status_code(),
            ApiError::Query(e) => e.status_code(),
            ApiError::Auth(e) => e.status_code(),
            ApiError::Cluster(e) => e.status_code(),
            ApiError::Meta(e) => e.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
