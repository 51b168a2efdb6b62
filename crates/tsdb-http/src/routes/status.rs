//! `GET /status`: unauthenticated node liveness/progress probe.
//! `index` is non-decreasing across observations from the same node.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct StatusBody {
    id: u64,
    index: u64,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        id: state.local_node_id.0,
        index: state.meta.last_applied_index(),
    })
}
