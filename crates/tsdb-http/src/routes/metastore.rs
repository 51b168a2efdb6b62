//! `GET /metastore`: a byte-for-byte dump of the catalog,
//! loadable by a peer's `restore`. Admin-only. The catalog snapshot is
//! built in memory and written out as one body; real shard bytes never
//! flow through this path, so buffering the (typically small) catalog
//! snapshot doesn't need true chunked streaming.

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Extension;
use tsdb_auth::Principal;

pub async fn export(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    state.auth.authorize_admin(&principal).await?;
    let catalog = state.meta.snapshot().await;

    let mut buf = Vec::new();
    tsdb_meta::snapshot::snapshot(&catalog, &mut buf).map_err(ApiError::Meta)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            r#"attachment; filename="meta""#,
        )
        .body(Body::from(buf))
        .expect("static headers and an in-memory body never fail to build"))
}
