//! Business logic services.

#![allow(missing_docs)]

pub mod aggregator;
pub mod poll;
pub mod vote;

pub use aggregator::PollAggregator;
pub use poll::{CreatePollInput, PollService, PollStats, UpdatePollInput};
pub use vote::{Provenance, VoteRequest, VoteService};
