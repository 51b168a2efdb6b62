//! Resolves the caller's [`Principal`] and stashes it in request
//! extensions; handlers then call `authorize_read`/`authorize_write`/
//! `authorize_admin` themselves with whatever database the request names,
//! since that isn't known uniformly at the middleware layer (`/write` and
//! `/query` carry it in the body/query string, `/data_nodes` doesn't need
//! one at all). Innermost layer before the handler.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use tsdb_auth::{credentials, Principal};

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = if state.auth_enabled {
        let query = req.uri().query().unwrap_or("");
        let params: HashMap<String, String> =
            serde_urlencoded::from_str(query).unwrap_or_default();
        let basic = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let creds = credentials::extract(
            params.get("u").map(String::as_str),
            params.get("p").map(String::as_str),
            basic,
        );
        state.auth.authenticate(creds).await?
    } else {
        Principal::Anonymous
    };

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
