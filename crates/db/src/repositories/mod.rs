//! Repositories for database access.

mod poll;
mod vote;

pub use poll::{OptionTally, PollFilter, PollRepository};
pub use vote::VoteRepository;
