//! Core business logic for pollbox.
//!
//! Services take the acting [`Actor`](pollbox_common::Actor) as an explicit
//! argument and read the current time from an injected clock.

pub mod services;
pub mod tally;

#[cfg(test)]
mod test_support;

pub use services::*;
pub use tally::{OptionResult, PollResult};
