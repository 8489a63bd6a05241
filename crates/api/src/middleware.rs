//! API middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use mockable::Clock;
use pollbox_common::{Actor, config::AuthConfig};
use pollbox_core::{PollAggregator, PollService, VoteService};
use pollbox_db::repositories::{PollRepository, VoteRepository};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub poll_service: PollService,
    pub aggregator: PollAggregator,
    pub vote_service: VoteService,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>, auth: AuthConfig) -> Self {
        let poll_repo = PollRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(db);

        let aggregator = PollAggregator::new(poll_repo.clone(), clock.clone());
        let poll_service = PollService::new(poll_repo, aggregator.clone(), clock.clone());
        let vote_service = VoteService::new(vote_repo, aggregator.clone(), clock);

        Self {
            poll_service,
            aggregator,
            vote_service,
            auth,
        }
    }
}

/// Resolve the current actor from the gateway header.
///
/// Every request gets an [`Actor`] in its extensions; a missing or blank
/// header means anonymous.
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let actor = Actor::from_id(
        req.headers()
            .get(state.auth.actor_header.as_str())
            .and_then(|value| value.to_str().ok()),
    );

    tracing::debug!(actor = ?actor.id(), "Resolved request actor");
    req.extensions_mut().insert(actor);

    next.run(req).await
}
