//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use pollbox_common::{Actor, AppError, AppResult};
use pollbox_core::{CreatePollInput, PollResult, PollStats, UpdatePollInput, VoteRequest};
use pollbox_db::repositories::PollFilter;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthActor, CurrentActor, RequestProvenance},
    middleware::AppState,
    response::{self, ApiResponse},
};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Poll with results, as seen by the current actor.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    #[serde(flatten)]
    pub poll: PollResult,
    /// The option the current actor voted for, if identified and voted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_option_id: Option<String>,
}

/// List polls query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPollsQuery {
    #[serde(default)]
    pub active_only: bool,
    pub owned_by: Option<String>,
    /// Shorthand for `ownedBy` = current actor.
    #[serde(default)]
    pub mine: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Stats query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(default)]
    pub mine: bool,
}

/// Create poll response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub poll_id: String,
}

/// Vote request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    pub poll_id: String,
    pub option_id: String,
}

/// Resolve `mine` against the current actor.
fn owner_scope(actor: &Actor, mine: bool, owned_by: Option<String>) -> AppResult<Option<String>> {
    if mine {
        return actor
            .id()
            .map(|id| Some(id.to_string()))
            .ok_or(AppError::Unauthorized);
    }
    Ok(owned_by)
}

/// List polls with results.
async fn list_polls(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Query(query): Query<ListPollsQuery>,
) -> AppResult<ApiResponse<Vec<PollResult>>> {
    let filter = PollFilter {
        active_only: query.active_only,
        owned_by: owner_scope(&actor, query.mine, query.owned_by)?,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        offset: query.offset.unwrap_or(0),
    };

    let polls = state.poll_service.list(filter).await?;
    Ok(ApiResponse::ok(polls))
}

/// Create a poll.
async fn create_poll(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Json(input): Json<CreatePollInput>,
) -> AppResult<impl IntoResponse> {
    let poll_id = state.poll_service.create(&actor, input).await?;
    Ok(ApiResponse::ok(CreatePollResponse { poll_id }).with_status(StatusCode::CREATED))
}

/// Poll and vote statistics.
async fn poll_stats(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<ApiResponse<PollStats>> {
    let owned_by = owner_scope(&actor, query.mine, None)?;
    let stats = state.poll_service.stats(owned_by.as_deref()).await?;
    Ok(ApiResponse::ok(stats))
}

/// Vote on a poll and return its updated results.
async fn vote(
    CurrentActor(actor): CurrentActor,
    RequestProvenance(provenance): RequestProvenance,
    State(state): State<AppState>,
    Json(body): Json<VoteBody>,
) -> AppResult<ApiResponse<PollResponse>> {
    let voted_option_id = actor.is_identified().then(|| body.option_id.clone());

    let poll = state
        .vote_service
        .submit(
            &actor,
            VoteRequest {
                poll_id: body.poll_id,
                option_id: body.option_id,
                provenance,
            },
        )
        .await?;

    Ok(ApiResponse::ok(PollResponse {
        poll,
        voted_option_id,
    }))
}

/// Get a poll with results.
async fn show_poll(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .aggregator
        .results(&poll_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?;

    let voted_option_id = state
        .vote_service
        .find_vote(&actor, &poll_id)
        .await?
        .map(|vote| vote.option_id);

    Ok(ApiResponse::ok(PollResponse {
        poll,
        voted_option_id,
    }))
}

/// Update a poll owned by the caller.
async fn update_poll(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(input): Json<UpdatePollInput>,
) -> AppResult<ApiResponse<PollResult>> {
    state.poll_service.update(&actor, &poll_id, input).await?;

    let poll = state
        .aggregator
        .results(&poll_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?;

    Ok(ApiResponse::ok(poll))
}

/// Delete a poll owned by the caller.
async fn delete_poll(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.poll_service.delete(&actor, &poll_id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route("/stats", get(poll_stats))
        .route("/vote", post(vote))
        .route(
            "/{id}",
            get(show_poll).patch(update_poll).delete(delete_poll),
        )
}
