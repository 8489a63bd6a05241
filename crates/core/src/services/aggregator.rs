//! Poll aggregator.
//!
//! Computes live results by re-counting votes on every read. There are no
//! stored counters to drift out of sync with the vote table.

use std::sync::Arc;

use mockable::Clock;
use pollbox_common::AppResult;
use pollbox_db::{entities::poll, repositories::PollRepository};

use crate::tally::{self, PollResult};

/// Read-side service producing [`PollResult`]s.
#[derive(Clone)]
pub struct PollAggregator {
    poll_repo: PollRepository,
    clock: Arc<dyn Clock>,
}

impl PollAggregator {
    /// Create a new poll aggregator.
    #[must_use]
    pub fn new(poll_repo: PollRepository, clock: Arc<dyn Clock>) -> Self {
        Self { poll_repo, clock }
    }

    /// Current results for a poll, or `None` if it does not exist.
    ///
    /// Inactive and expired polls are returned like any other.
    pub async fn results(&self, poll_id: &str) -> AppResult<Option<PollResult>> {
        let Some(poll) = self.poll_repo.find_by_id(poll_id).await? else {
            return Ok(None);
        };

        let tallies = self.poll_repo.tally_options(&poll.id).await?;
        tally::build_result(poll, tallies, self.clock.utc()).map(Some)
    }

    /// Results for several polls using a single tally query.
    ///
    /// Output order follows `polls`.
    pub async fn results_for_polls(&self, polls: Vec<poll::Model>) -> AppResult<Vec<PollResult>> {
        let ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();
        let mut grouped = tally::group_by_poll(self.poll_repo.tally_options_for_polls(&ids).await?);
        let now = self.clock.utc();

        polls
            .into_iter()
            .map(|poll| {
                let tallies = grouped.remove(&poll.id).unwrap_or_default();
                tally::build_result(poll, tallies, now)
            })
            .collect()
    }
}
