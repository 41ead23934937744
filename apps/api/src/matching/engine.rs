use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::batch::{log_progress, run_bounded, CancellationFlag};
use crate::errors::AppError;
use crate::extraction::{temperature, ExtractionGateway, Instruction};
use crate::matching::prompts::{CANDIDATE_LABEL, JOB_LABEL, SCORING_TASK};
use crate::models::{CandidateProfile, ExtractedProfile, JobPosting, JobSummary, MatchResult, MatchRow};
use crate::store::{Inserted, RecordStore};

/// Outcome counts of one cross-product matching run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchRunReport {
    pub scored: usize,
    pub skipped_existing: usize,
    pub skipped_unsummarized: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// A pair where both sides carry structured data and no Match exists yet.
struct PendingPair<'a> {
    job: &'a JobPosting,
    summary: &'a JobSummary,
    candidate: &'a CandidateProfile,
    profile: &'a ExtractedProfile,
}

enum PairOutcome {
    Scored,
    AlreadyMatched,
    Failed,
}

#[derive(Clone)]
pub struct MatchEngine {
    store: RecordStore,
    gateway: Arc<ExtractionGateway>,
    workers: usize,
}

impl MatchEngine {
    pub fn new(store: RecordStore, gateway: Arc<ExtractionGateway>, workers: usize) -> Self {
        Self {
            store,
            gateway,
            workers: workers.max(1),
        }
    }

    /// Scores one summary/profile pair. Any failure to obtain a usable
    /// `match_score` is a `Scoring` error; nothing is defaulted.
    pub async fn score(
        &self,
        summary: &JobSummary,
        profile: &ExtractedProfile,
    ) -> Result<MatchResult, AppError> {
        let input = scoring_input(summary, profile)?;
        let instruction = Instruction {
            task: SCORING_TASK,
            input_label: JOB_LABEL,
            input: &input,
            temperature: temperature::MATCH_SCORING,
        };

        let raw: MatchResult = self
            .gateway
            .extract(&instruction)
            .await
            .map_err(|e| AppError::Scoring(e.to_string()))?;

        raw.normalized().map_err(AppError::Scoring)
    }

    /// Scores a single pair on demand. An existing Match is returned untouched.
    pub async fn match_pair(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Inserted<MatchRow>, AppError> {
        if let Some(existing) = self.store.find_match(job_id, candidate_id).await? {
            return Ok(Inserted::AlreadyExists(existing));
        }

        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

        let summary = job.summary().ok_or_else(|| {
            AppError::Validation(format!("Job '{}' has not been summarized", job.title))
        })?;
        let profile = candidate.profile().ok_or_else(|| {
            AppError::Validation(format!(
                "Candidate '{}' has no extracted profile",
                candidate.name
            ))
        })?;

        let result = self.score(summary, profile).await?;
        let stored = self.store.insert_match(job_id, candidate_id, &result).await?;
        if stored.is_created() {
            info!(
                "Matched '{}' to '{}' with score {}",
                candidate.name, job.title, result.match_score
            );
        }
        Ok(stored)
    }

    /// Scores every job × candidate pair that has no Match yet.
    ///
    /// Pairs already matched and pairs missing a summary or profile are
    /// skipped. One pair failing never stops the rest of the run.
    pub async fn run(&self, cancel: &CancellationFlag) -> Result<MatchRunReport, AppError> {
        let jobs = self.store.list_jobs().await?;
        let candidates = self.store.list_candidates().await?;
        let existing = self.store.matched_pairs().await?;

        let mut report = MatchRunReport::default();
        let mut pending = Vec::new();

        for job in &jobs {
            for candidate in &candidates {
                if existing.contains(&(job.id, candidate.id)) {
                    report.skipped_existing += 1;
                    continue;
                }
                match (job.summary(), candidate.profile()) {
                    (Some(summary), Some(profile)) => pending.push(PendingPair {
                        job,
                        summary,
                        candidate,
                        profile,
                    }),
                    _ => report.skipped_unsummarized += 1,
                }
            }
        }

        info!(
            "Matching {} pairs ({} already matched, {} unsummarized)",
            pending.len(),
            report.skipped_existing,
            report.skipped_unsummarized
        );

        let run = run_bounded(
            "Matching",
            pending,
            self.workers,
            cancel,
            |pair| self.score_and_store(pair),
            log_progress("Matching"),
        )
        .await;

        for outcome in run.outputs {
            match outcome {
                PairOutcome::Scored => report.scored += 1,
                PairOutcome::AlreadyMatched => report.skipped_existing += 1,
                PairOutcome::Failed => report.failed += 1,
            }
        }
        report.cancelled = run.cancelled;

        info!("Matching finished: {report:?}");
        Ok(report)
    }

    async fn score_and_store(&self, pair: PendingPair<'_>) -> PairOutcome {
        let PendingPair {
            job,
            summary,
            candidate,
            profile,
        } = pair;

        let result = match self.score(summary, profile).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "Scoring '{}' against '{}' failed: {e}",
                    candidate.name, job.title
                );
                return PairOutcome::Failed;
            }
        };

        match self.store.insert_match(job.id, candidate.id, &result).await {
            Ok(Inserted::Created(_)) => PairOutcome::Scored,
            Ok(Inserted::AlreadyExists(_)) => PairOutcome::AlreadyMatched,
            Err(e) => {
                error!(
                    "Storing match '{}' x '{}' failed: {e}",
                    job.title, candidate.name
                );
                PairOutcome::Failed
            }
        }
    }
}

fn scoring_input(summary: &JobSummary, profile: &ExtractedProfile) -> Result<String, AppError> {
    let job = serde_json::to_string_pretty(summary).map_err(|e| AppError::Internal(e.into()))?;
    let candidate =
        serde_json::to_string_pretty(profile).map_err(|e| AppError::Internal(e.into()))?;
    Ok(format!("{job}\n\n{CANDIDATE_LABEL}:\n{candidate}"))
}
