//! `/data_nodes`: cluster admin manages data-node membership. All
//! three routes require admin privilege.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tsdb_auth::Principal;
use tsdb_base::DataNodeId;

#[derive(Debug, Deserialize)]
pub struct CreateDataNode {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DataNodeBody {
    pub id: u64,
    pub url: String,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<DataNodeBody>>, ApiError> {
    state.auth.authorize_admin(&principal).await?;
    let nodes = state
        .registry
        .all()
        .await
        .into_iter()
        .map(|n| DataNodeBody { id: n.id.0, url: n.url })
        .collect();
    Ok(Json(nodes))
}

/// 201 with the assigned id; a duplicate URL is a 409 `ClusterError::Meta`,
/// a malformed URL is a 400, and a broker that can't commit the membership
/// change is a 502 — all from `ClusterError::status_code`.
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateDataNode>,
) -> Result<(StatusCode, Json<DataNodeBody>), ApiError> {
    state.auth.authorize_admin(&principal).await?;
    reqwest::Url::parse(&body.url)
        .map_err(|_| ApiError::BadRequest("invalid data node url".to_string()))?;
    let node = state.registry.register(body.url).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataNodeBody { id: node.id.0, url: node.url }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.auth.authorize_admin(&principal).await?;
    state.registry.unregister(DataNodeId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
