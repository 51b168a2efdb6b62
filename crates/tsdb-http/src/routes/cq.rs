//! `POST /process_continuous_queries`: triggers an out-of-band CQ pass
//! instead of waiting for the runner's own 1s tick. Admin-only, since it
//! forces work every data node would otherwise pace on its own schedule.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use tsdb_auth::Principal;

pub async fn process(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, ApiError> {
    state.auth.authorize_admin(&principal).await?;
    state.cq_runner.tick().await;
    Ok(StatusCode::NO_CONTENT)
}
