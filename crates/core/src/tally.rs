//! Vote tallying.
//!
//! Turns a poll row and its per-option counts into the read view returned by
//! every poll endpoint. Everything here is pure; the counts come from
//! [`PollRepository::tally_options`](pollbox_db::repositories::PollRepository::tally_options).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pollbox_common::{AppError, AppResult};
use pollbox_db::{entities::poll, repositories::OptionTally};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

/// A poll with derived vote counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub is_active: bool,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    /// Options in display order.
    pub options: Vec<OptionResult>,
    pub total_votes: u64,
    pub is_expired: bool,
}

/// One option of a [`PollResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub id: String,
    pub text: String,
    pub order_index: i32,
    pub votes: u64,
    /// Share of the poll's votes, 0-100. Not rounded.
    pub percentage: f64,
}

/// Percentage of `total` that `votes` represents. Zero when nobody voted.
#[must_use]
pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    votes as f64 / total as f64 * 100.0
}

/// Whether an expiry lies strictly before `now`.
#[must_use]
pub fn is_expired(expires_at: Option<&DateTimeWithTimeZone>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|exp| *exp < now)
}

/// Build the read view of a poll from its option tallies.
///
/// Tallies belonging to other polls are ignored. Options are ordered by
/// `order_index`, then by id.
pub fn build_result(
    poll: poll::Model,
    tallies: Vec<OptionTally>,
    now: DateTime<Utc>,
) -> AppResult<PollResult> {
    let mut counted = tallies
        .into_iter()
        .filter(|t| t.poll_id == poll.id)
        .map(|t| {
            let votes = u64::try_from(t.votes).map_err(|_| {
                AppError::Internal(format!("Negative vote count for option {}", t.id))
            })?;
            Ok((t, votes))
        })
        .collect::<AppResult<Vec<_>>>()?;

    counted.sort_by(|(a, _), (b, _)| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.id.cmp(&b.id))
    });

    let total_votes: u64 = counted.iter().map(|(_, votes)| votes).sum();

    let options = counted
        .into_iter()
        .map(|(t, votes)| OptionResult {
            id: t.id,
            text: t.text,
            order_index: t.order_index,
            votes,
            percentage: percentage(votes, total_votes),
        })
        .collect();

    let expired = is_expired(poll.expires_at.as_ref(), now);

    Ok(PollResult {
        id: poll.id,
        title: poll.title,
        description: poll.description,
        created_by: poll.created_by,
        is_active: poll.is_active,
        expires_at: poll.expires_at,
        created_at: poll.created_at,
        updated_at: poll.updated_at,
        options,
        total_votes,
        is_expired: expired,
    })
}

/// Group tallies by poll id, for building several results from one query.
#[must_use]
pub fn group_by_poll(tallies: Vec<OptionTally>) -> HashMap<String, Vec<OptionTally>> {
    let mut grouped: HashMap<String, Vec<OptionTally>> = HashMap::new();
    for tally in tallies {
        grouped.entry(tally.poll_id.clone()).or_default().push(tally);
    }
    grouped
}
