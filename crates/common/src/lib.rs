//! Common utilities and shared types for pollbox.
//!
//! This crate provides foundational components used across all pollbox crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Actors**: The identified-or-anonymous caller via [`Actor`]
//!
//! # Example
//!
//! ```no_run
//! use pollbox_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod id;

pub use actor::Actor;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
