//! Assembles the route table and the middleware chain, innermost
//! last: recovery → logging → request-id → CORS → version header → gzip →
//! auth → handler. `ServiceBuilder` layers compose outside-in in the order
//! they're added, so the first `.layer()` call here is the outermost
//! service — recovery stays outermost.

use crate::middleware::{auth, recovery::RecoveryLayer, request_id, version};
use crate::routes::{cq, data_nodes, internal, metastore, ping, query, status, write};
use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::compression::CompressionLayer;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let authenticated = Router::new()
        .route("/query", get(query::query))
        .route("/write", post(write::write))
        .route(
            "/data_nodes",
            get(data_nodes::list).post(data_nodes::create),
        )
        .route("/data_nodes/:id", delete(data_nodes::delete))
        .route("/metastore", get(metastore::export))
        .route(
            "/process_continuous_queries",
            post(cq::process),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let public = Router::new()
        .route("/status", get(status::status))
        .route("/ping", get(ping::ping))
        .route("/internal/replicate", post(internal::replicate));

    authenticated
        .merge(public)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(RecoveryLayer)
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id::propagate))
                .layer(cors)
                .layer(axum::middleware::from_fn(version::add_header))
                .layer(CompressionLayer::new()),
        )
}
