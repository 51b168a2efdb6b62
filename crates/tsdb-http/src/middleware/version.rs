//! Stamps `X-Influxdb-Version` on every response, matching the header this
//! wire format's clients historically key off of to detect server version.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

pub const HEADER: &str = "X-Influxdb-Version";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn add_header(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(HEADER, HeaderValue::from_static(VERSION));
    response
}
