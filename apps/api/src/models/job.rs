use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::extraction::{FieldKind, FieldSchema, FieldSpec, StructuredRecord};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Absent when summarization failed; such jobs are skipped by matching.
    pub summary: Option<Json<JobSummary>>,
    pub created_at: DateTime<Utc>,
}

impl JobPosting {
    pub fn summary(&self) -> Option<&JobSummary> {
        self.summary.as_ref().map(|s| &s.0)
    }
}

/// Structured requirements extracted from a job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub required_skills: Vec<String>,
    pub required_experience: String,
    pub required_qualifications: Vec<String>,
    pub key_responsibilities: Vec<String>,
    #[serde(default)]
    pub preferred_qualifications: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
}

static JOB_SUMMARY_SCHEMA: FieldSchema = FieldSchema {
    name: "job_summary",
    fields: &[
        FieldSpec::required("required_skills", FieldKind::TextList),
        FieldSpec::required("required_experience", FieldKind::Text),
        FieldSpec::required("required_qualifications", FieldKind::TextList),
        FieldSpec::required("key_responsibilities", FieldKind::TextList),
        FieldSpec::optional("preferred_qualifications", FieldKind::TextList),
        FieldSpec::optional("soft_skills", FieldKind::TextList),
    ],
};

impl StructuredRecord for JobSummary {
    fn schema() -> &'static FieldSchema {
        &JOB_SUMMARY_SCHEMA
    }
}

/// One entry of the jobs file: `[{"title": ..., "description": ...}, ...]`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSeed {
    pub title: String,
    pub description: String,
}
