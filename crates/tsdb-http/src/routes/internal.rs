//! `/internal/replicate`: the receiving half of a peer coordinator's
//! [`tsdb_write::replica::HttpReplicaTransport`] fan-out. Not part of the
//! user-facing surface in §4.8's route table — node-to-node RPC rather
//! than a client request, so it sits outside the `auth::authenticate`
//! layer alongside `/status`/`/ping`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tsdb_base::ShardId;
use tsdb_write::StoredPoint;

#[derive(Debug, Deserialize)]
pub struct ReplicateBody {
    pub shard: u64,
    pub series_key: String,
    pub point: StoredPoint,
}

pub async fn replicate(
    State(state): State<AppState>,
    Json(body): Json<ReplicateBody>,
) -> Result<StatusCode, ApiError> {
    state
        .writer
        .receive_replicated(ShardId(body.shard), body.series_key, body.point);
    Ok(StatusCode::NO_CONTENT)
}
