//! Match Engine — scores a job summary against a candidate profile and keeps
//! exactly one Match per (job, candidate) pair.

pub mod engine;
pub mod handlers;
mod prompts;

pub use engine::{MatchEngine, MatchRunReport};
