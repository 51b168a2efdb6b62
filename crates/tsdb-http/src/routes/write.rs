//! `POST /write`: normalizes and ingests a `BatchPoints` envelope,
//! requiring write privilege on the named database.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use tsdb_auth::Principal;
use tsdb_write::BatchPoints;

pub async fn write(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(batch): Json<BatchPoints>,
) -> Result<StatusCode, ApiError> {
    let ack = state.writer.write(&principal, batch).await?;
    tracing::debug!(points_written = ack.points_written, "write accepted");
    Ok(StatusCode::NO_CONTENT)
}
