//! HTTP surface: the axum router, middleware chain, and per-route
//! handlers that bind the metastore, broker, auth, cluster, write, query
//! and continuous-query components into a single process.

pub mod encode;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::AppState;
