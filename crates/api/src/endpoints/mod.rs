//! API endpoints.

mod health;
mod poll;

use axum::Router;

use crate::middleware::AppState;

pub use health::router as health_router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest("/polls", poll::router())
}
