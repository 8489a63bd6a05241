//! HTTP API layer for pollbox.
//!
//! - **Endpoints**: poll listing, creation, voting, results and owner actions
//! - **Extractors**: current actor, identified actor, request provenance
//! - **Middleware**: actor resolution from the gateway header
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::router;
pub use middleware::AppState;

/// The full application: `/api` routes, `/health` and actor resolution.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .merge(endpoints::health_router())
        .layer(from_fn_with_state(state.clone(), middleware::actor_middleware))
        .with_state(state)
}
