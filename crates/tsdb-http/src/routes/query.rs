//! `GET /query`: runs a statement list against a database, requiring
//! read privilege on it. Errors from the pipeline itself are embedded
//! per-statement and still answer 200; only a failure before any
//! statement runs (missing `db`, bad credentials, a parse failure)
//! surfaces as a real HTTP error, still wrapped in the `results` envelope.

use crate::encode::json_response;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use serde::{Deserialize, Serialize};
use tsdb_auth::Principal;
use tsdb_query::StatementResult;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    db: String,
    #[serde(default)]
    q: String,
    #[serde(default)]
    pretty: bool,
}

#[derive(Serialize)]
struct ResultsEnvelope {
    results: Vec<StatementResult>,
}

pub async fn query(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<QueryParams>,
) -> Response {
    match state.query.query(&principal, &params.db, &params.q).await {
        Ok(results) => json_response(StatusCode::OK, &ResultsEnvelope { results }, params.pretty),
        Err(err) => {
            let api_err = ApiError::from(err);
            let status = api_err.status_code();
            let envelope = ResultsEnvelope {
                results: vec![StatementResult {
                    series: Vec::new(),
                    error: Some(api_err.to_string()),
                }],
            };
            json_response(status, &envelope, params.pretty)
        }
    }
}
