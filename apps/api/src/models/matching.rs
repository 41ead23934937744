use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::extraction::{FieldKind, FieldSchema, FieldSpec, StructuredRecord};

/// The scored relationship between one job and one candidate.
/// Exactly one row per (job_id, candidate_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MatchRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub match_score: f64,
    pub score_breakdown: Option<Json<MatchResult>>,
    pub is_shortlisted: bool,
    pub interview_scheduled: bool,
    pub interview_date: Option<String>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MatchRow {
    pub fn breakdown(&self) -> Option<&MatchResult> {
        self.score_breakdown.as_ref().map(|b| &b.0)
    }
}

/// A match joined with the display fields of its job and candidate.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: MatchRow,
    pub job_title: String,
    pub candidate_name: String,
    pub candidate_email: Option<String>,
}

/// Scoring response: overall score, per-dimension sub-scores, and gap lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_score: f64,
    #[serde(default)]
    pub skills_match: Option<f64>,
    #[serde(default)]
    pub experience_match: Option<f64>,
    #[serde(default)]
    pub qualifications_match: Option<f64>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub missing_experience: Vec<String>,
    #[serde(default)]
    pub missing_qualifications: Vec<String>,
}

static MATCH_RESULT_SCHEMA: FieldSchema = FieldSchema {
    name: "match_result",
    fields: &[
        FieldSpec::required("match_score", FieldKind::Number),
        FieldSpec::optional("skills_match", FieldKind::Number),
        FieldSpec::optional("experience_match", FieldKind::Number),
        FieldSpec::optional("qualifications_match", FieldKind::Number),
        FieldSpec::optional("missing_skills", FieldKind::TextList),
        FieldSpec::optional("missing_experience", FieldKind::TextList),
        FieldSpec::optional("missing_qualifications", FieldKind::TextList),
    ],
};

impl StructuredRecord for MatchResult {
    fn schema() -> &'static FieldSchema {
        &MATCH_RESULT_SCHEMA
    }
}

impl MatchResult {
    /// Clamps every score into [0, 100] and rounds to one decimal.
    /// A non-finite overall score is an error, never a default.
    pub fn normalized(self) -> Result<Self, String> {
        if !self.match_score.is_finite() {
            return Err(format!("match_score is not a finite number: {}", self.match_score));
        }
        Ok(Self {
            match_score: clamp_score(self.match_score),
            skills_match: self.skills_match.filter(|s| s.is_finite()).map(clamp_score),
            experience_match: self.experience_match.filter(|s| s.is_finite()).map(clamp_score),
            qualifications_match: self
                .qualifications_match
                .filter(|s| s.is_finite())
                .map(clamp_score),
            ..self
        })
    }
}

fn clamp_score(score: f64) -> f64 {
    (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// Display band for a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn of(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::High
        } else if score >= 50.0 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}
