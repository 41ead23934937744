pub mod candidate;
pub mod job;
pub mod matching;

pub use candidate::{CandidateProfile, ExtractedProfile};
pub use job::{JobPosting, JobSeed, JobSummary};
pub use matching::{MatchListing, MatchResult, MatchRow, ScoreBand};
