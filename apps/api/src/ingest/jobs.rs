use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::extraction::{temperature, Instruction};
use crate::ingest::prompts::{JOB_LABEL, JOB_SUMMARY_TASK};
use crate::ingest::Ingestor;
use crate::models::{JobPosting, JobSeed, JobSummary};
use crate::store::Inserted;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobLoadReport {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Ingestor {
    /// Loads `[{"title", "description"}, ...]` from a JSON file. Titles that
    /// are already stored are skipped without calling the model.
    pub async fn load_jobs_file(&self, path: &Path) -> Result<JobLoadReport, AppError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Validation(format!("Cannot read jobs file {}: {e}", path.display()))
        })?;
        let seeds: Vec<JobSeed> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Validation(format!("Jobs file {} is not valid: {e}", path.display()))
        })?;

        let mut report = JobLoadReport::default();
        for seed in &seeds {
            match self.add_job(&seed.title, &seed.description).await {
                Ok(Inserted::Created(_)) => report.loaded += 1,
                Ok(Inserted::AlreadyExists(_)) => report.skipped += 1,
                Err(AppError::Storage(e)) => {
                    error!("Storing job '{}' failed: {e}", seed.title);
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("Skipping job '{}': {e}", seed.title);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Jobs file {}: {} loaded, {} already present, {} failed",
            path.display(),
            report.loaded,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Creates one job. A job whose summarization fails is still stored,
    /// without a summary, and is left out of matching.
    pub async fn add_job(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Inserted<JobPosting>, AppError> {
        let title = title.trim();
        if title.is_empty() || description.trim().is_empty() {
            return Err(AppError::Validation(
                "title and description cannot be empty".to_string(),
            ));
        }

        if let Some(existing) = self.store.find_job_by_title(title).await? {
            return Ok(Inserted::AlreadyExists(existing));
        }

        let summary = self.summarize_job(title, description).await;
        self.store
            .insert_job(title, description, summary.as_ref())
            .await
    }

    async fn summarize_job(&self, title: &str, description: &str) -> Option<JobSummary> {
        let instruction = Instruction {
            task: JOB_SUMMARY_TASK,
            input_label: JOB_LABEL,
            input: description,
            temperature: temperature::JOB_SUMMARY,
        };
        match self.gateway.extract::<JobSummary>(&instruction).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Summarizing job '{title}' failed: {e}");
                if let Some(raw) = e.raw_response() {
                    debug!("Raw summary response: {raw}");
                }
                None
            }
        }
    }
}
