//! `GET /ping`: unauthenticated liveness check, always 204.

use axum::http::StatusCode;

pub async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}
