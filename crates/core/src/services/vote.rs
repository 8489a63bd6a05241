//! Vote admission.
//!
//! A vote attempt is checked in a fixed order and rejected at the first
//! failing rule:
//!
//! 1. the poll exists and is active,
//! 2. the poll has not expired,
//! 3. the option belongs to the poll,
//! 4. an identified voter has not voted on the poll before.
//!
//! The checks and the insert share one transaction. For identified voters the
//! poll row is locked first, so two concurrent attempts by the same voter
//! cannot both pass the duplicate check.

use std::sync::Arc;

use mockable::Clock;
use pollbox_common::{Actor, AppError, AppResult, IdGenerator};
use pollbox_db::{entities::vote, repositories::VoteRepository};
use sea_orm::Set;
use tracing::{debug, info};

use super::aggregator::PollAggregator;
use crate::tally::{self, PollResult};

/// Where a vote came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A vote attempt.
#[derive(Debug, Clone)]
pub struct VoteRequest {
    pub poll_id: String,
    pub option_id: String,
    pub provenance: Provenance,
}

/// Vote service for admitting and recording votes.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    aggregator: PollAggregator,
    clock: Arc<dyn Clock>,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub fn new(vote_repo: VoteRepository, aggregator: PollAggregator, clock: Arc<dyn Clock>) -> Self {
        Self {
            vote_repo,
            aggregator,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Validate a vote attempt and record it.
    pub async fn admit(&self, actor: &Actor, request: VoteRequest) -> AppResult<vote::Model> {
        let txn = self.vote_repo.begin().await?;

        let poll = if actor.is_identified() {
            self.vote_repo
                .find_poll_for_update(&txn, &request.poll_id)
                .await?
        } else {
            self.vote_repo.find_poll(&txn, &request.poll_id).await?
        };

        let Some(poll) = poll.filter(|p| p.is_active) else {
            debug!(poll_id = %request.poll_id, "Vote rejected: poll inactive or missing");
            return Err(AppError::PollInactiveOrMissing(request.poll_id));
        };

        let now = self.clock.utc();
        if tally::is_expired(poll.expires_at.as_ref(), now) {
            debug!(poll_id = %poll.id, "Vote rejected: poll expired");
            return Err(AppError::PollExpired(poll.id));
        }

        let option = self
            .vote_repo
            .find_option(&txn, &request.option_id)
            .await?
            .filter(|o| o.poll_id == poll.id);
        let Some(option) = option else {
            debug!(
                poll_id = %poll.id,
                option_id = %request.option_id,
                "Vote rejected: option not in poll"
            );
            return Err(AppError::InvalidOption(request.option_id));
        };

        if let Some(voter_id) = actor.id() {
            let existing = self
                .vote_repo
                .find_by_voter_and_poll(&txn, voter_id, &poll.id)
                .await?;
            if existing.is_some() {
                debug!(poll_id = %poll.id, voter_id = %voter_id, "Vote rejected: already voted");
                return Err(AppError::DuplicateVote(poll.id));
            }
        }

        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            option_id: Set(option.id),
            voter_id: Set(actor.id().map(ToString::to_string)),
            ip_address: Set(request.provenance.ip_address),
            user_agent: Set(request.provenance.user_agent),
            created_at: Set(now.into()),
        };
        let vote = self.vote_repo.insert(&txn, model).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            vote_id = %vote.id,
            poll_id = %poll.id,
            option_id = %vote.option_id,
            anonymous = vote.voter_id.is_none(),
            "Vote recorded"
        );

        Ok(vote)
    }

    /// Admit a vote and return the poll's fresh results.
    pub async fn submit(&self, actor: &Actor, request: VoteRequest) -> AppResult<PollResult> {
        let poll_id = request.poll_id.clone();
        self.admit(actor, request).await?;

        self.aggregator
            .results(&poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))
    }

    /// The actor's existing vote on a poll. Always `None` for anonymous actors.
    pub async fn find_vote(&self, actor: &Actor, poll_id: &str) -> AppResult<Option<vote::Model>> {
        let Some(voter_id) = actor.id() else {
            return Ok(None);
        };

        self.vote_repo
            .find_by_voter_and_poll(self.vote_repo.connection(), voter_id, poll_id)
            .await
    }
}
