//! Rate limiting functionality for the GenAI router.
//!
//! Admission is decided per client identity with a sliding window log: at most `limit`
//! requests are admitted within any trailing window of `duration`. State is kept in memory
//! for the lifetime of the process.

#![deny(missing_docs)]

mod error;
mod manager;
mod storage;
mod window;

pub use error::RateLimitError;
pub use manager::RateLimitManager;
pub use storage::{InMemoryStorage, RateLimitResult};
