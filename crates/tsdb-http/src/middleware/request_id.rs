//! Request-id propagation. [`crate::middleware::recovery`] is the layer
//! that actually mints the id (it is outermost and wants the id available
//! before anything downstream can panic); this middleware's only job is to
//! copy that id onto the outgoing response header once a handler completes
//! normally.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub const HEADER: &str = "Request-Id";

/// Stamped into request extensions by the recovery layer. A thin newtype
/// rather than a bare `String` so it can't be confused with some other
/// extension of the same underlying type.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn propagate(req: Request, next: Next) -> Response {
    let id = req.extensions().get::<RequestId>().cloned();
    let mut response = next.run(req).await;
    if let Some(id) = id {
        if let Ok(value) = axum::http::HeaderValue::from_str(&id.0) {
            response.headers_mut().insert(HEADER, value);
        }
    }
    response
}
