//! Workflow State Machine — shortlisting, interview scheduling and feedback
//! on an existing Match.
//!
//! A Match row only exists once scored, so every row starts in `Scored`.
//! Flags are only ever set, never cleared: there is no un-shortlist or
//! un-schedule transition.

pub mod handlers;
pub mod invitations;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{MatchListing, MatchRow};
use crate::store::{MatchFilter, RecordStore};

pub use invitations::{InvitationOutcome, Invitations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    Scored,
    Shortlisted,
    InterviewScheduled,
}

impl MatchState {
    pub fn of(row: &MatchRow) -> Self {
        if row.interview_scheduled {
            MatchState::InterviewScheduled
        } else if row.is_shortlisted {
            MatchState::Shortlisted
        } else {
            MatchState::Scored
        }
    }

    pub fn can_schedule(self) -> Result<(), String> {
        match self {
            MatchState::Shortlisted => Ok(()),
            MatchState::Scored => Err("match must be shortlisted before scheduling".to_string()),
            MatchState::InterviewScheduled => {
                Err("an interview is already scheduled for this match".to_string())
            }
        }
    }

    pub fn can_record_feedback(self) -> Result<(), String> {
        match self {
            MatchState::Scored => {
                Err("feedback can only be recorded once the match is shortlisted".to_string())
            }
            MatchState::Shortlisted | MatchState::InterviewScheduled => Ok(()),
        }
    }
}

/// Shortlisted matches of one job, best score first.
#[derive(Debug, Clone, Serialize)]
pub struct JobShortlist {
    pub job_id: Uuid,
    pub job_title: String,
    pub matches: Vec<MatchListing>,
}

#[derive(Clone)]
pub struct Workflow {
    store: RecordStore,
}

impl Workflow {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub async fn get(&self, match_id: Uuid) -> Result<MatchRow, AppError> {
        self.store
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match {match_id} not found")))
    }

    /// SCORED → SHORTLISTED. Shortlisting an already shortlisted match
    /// writes nothing and returns it as is.
    pub async fn shortlist(&self, match_id: Uuid) -> Result<MatchRow, AppError> {
        let row = self.get(match_id).await?;
        if row.is_shortlisted {
            return Ok(row);
        }

        self.store.mark_shortlisted(match_id).await?;
        info!("Match {match_id} shortlisted");
        self.get(match_id).await
    }

    /// SHORTLISTED → INTERVIEW_SCHEDULED. Rejected before any write from
    /// every other state.
    pub async fn schedule_interview(
        &self,
        match_id: Uuid,
        interview_date: &str,
    ) -> Result<MatchRow, AppError> {
        let interview_date = interview_date.trim();
        if interview_date.is_empty() {
            return Err(AppError::Validation(
                "interview_date cannot be empty".to_string(),
            ));
        }

        let row = self.get(match_id).await?;
        MatchState::of(&row)
            .can_schedule()
            .map_err(|reason| AppError::InvalidStateTransition(format!("Match {match_id}: {reason}")))?;

        // The update re-checks the state, so a concurrent schedule loses cleanly.
        if !self.store.schedule_interview(match_id, interview_date).await? {
            let current = self.get(match_id).await?;
            let reason = MatchState::of(&current)
                .can_schedule()
                .err()
                .unwrap_or_else(|| "match changed while scheduling".to_string());
            return Err(AppError::InvalidStateTransition(format!(
                "Match {match_id}: {reason}"
            )));
        }

        info!("Interview for match {match_id} scheduled for {interview_date}");
        self.get(match_id).await
    }

    /// Attaches feedback to a shortlisted or scheduled match. The primary
    /// state is unchanged.
    pub async fn record_feedback(&self, match_id: Uuid, feedback: &str) -> Result<MatchRow, AppError> {
        if feedback.trim().is_empty() {
            return Err(AppError::Validation("feedback cannot be empty".to_string()));
        }

        let row = self.get(match_id).await?;
        MatchState::of(&row)
            .can_record_feedback()
            .map_err(|reason| AppError::InvalidStateTransition(format!("Match {match_id}: {reason}")))?;

        self.store.set_feedback(match_id, feedback).await?;
        info!("Feedback recorded for match {match_id}");
        self.get(match_id).await
    }

    /// Shortlisted matches grouped by job, for the scheduling view.
    pub async fn shortlisted_by_job(&self) -> Result<Vec<JobShortlist>, AppError> {
        let listings = self
            .store
            .list_matches(MatchFilter {
                shortlisted_only: true,
                ..Default::default()
            })
            .await?;

        let mut groups: Vec<JobShortlist> = Vec::new();
        for listing in listings {
            let job_id = listing.record.job_id;
            match groups.iter_mut().find(|g| g.job_id == job_id) {
                Some(group) => group.matches.push(listing),
                None => groups.push(JobShortlist {
                    job_id,
                    job_title: listing.job_title.clone(),
                    matches: vec![listing],
                }),
            }
        }

        for group in &mut groups {
            group
                .matches
                .sort_by(|a, b| b.record.match_score.total_cmp(&a.record.match_score));
        }
        Ok(groups)
    }
}
