//! Recovery middleware: `axum`/`tower-http` at the
//! versions this workspace pins don't ship a ready-made panic-catching
//! layer, so this is a small hand-rolled `tower::Layer`/`Service` wrapping
//! `std::panic::catch_unwind` around the inner service's call. It is the
//! outermost layer in the stack (see `routes::router`) and mints the
//! request id every other layer and handler sees.
//!
//! A panic anywhere downstream is caught here, logged with the request id,
//! and turned into a 500 instead of taking down the server task.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

use super::request_id::RequestId;

#[derive(Clone, Default)]
pub struct RecoveryLayer;

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoveryService { inner }
    }
}

#[derive(Clone)]
pub struct RecoveryService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RecoveryService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response<Body>, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = RequestId(Uuid::new_v4().to_string());
        req.extensions_mut().insert(request_id.clone());

        let mut inner = self.inner.clone();
        async move {
            match AssertUnwindSafe(inner.call(req)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(&panic);
                    tracing::error!(
                        request_id = %request_id.0,
                        panic = %message,
                        "request handler panicked"
                    );
                    Ok(internal_error_response(&request_id.0))
                }
            }
        }
        .boxed()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    request_id: &'a str,
}

fn internal_error_response(request_id: &str) -> Response<Body> {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal server error",
            request_id,
        }),
    )
        .into_response()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
