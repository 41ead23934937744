//! Record Store — durable storage for jobs, candidates and matches.
//!
//! Every write is a single statement against SQLite and is durable when the
//! call returns. Uniqueness (job title, resume path, job/candidate pair) is
//! enforced by the schema, so "check then insert" cannot race into duplicates:
//! inserts use `ON CONFLICT DO NOTHING` and report which side of the race won.

use std::collections::HashSet;

use anyhow::anyhow;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CandidateProfile, ExtractedProfile, JobPosting, JobSummary, MatchListing, MatchResult,
    MatchRow,
};

/// Result of an idempotent insert.
#[derive(Debug, Clone)]
pub enum Inserted<T> {
    Created(T),
    AlreadyExists(T),
}

impl<T> Inserted<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Inserted::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Inserted::Created(v) | Inserted::AlreadyExists(v) => v,
        }
    }
}

pub struct NewCandidate<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub source_path: &'a str,
    pub extracted_profile: Option<&'a ExtractedProfile>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MatchFilter {
    pub job_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    #[serde(default)]
    pub shortlisted_only: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardCounts {
    pub jobs: i64,
    pub candidates: i64,
    pub matches: i64,
    pub shortlisted: i64,
    pub interviews_scheduled: i64,
}

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub async fn insert_job(
        &self,
        title: &str,
        description: &str,
        summary: Option<&JobSummary>,
    ) -> Result<Inserted<JobPosting>, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, title, description, summary, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(summary.map(Json))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let job = self
            .find_job_by_title(title)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow!("job '{title}' missing after insert")))?;

        if result.rows_affected() == 1 {
            info!("Stored job {} '{}'", job.id, job.title);
            Ok(Inserted::Created(job))
        } else {
            Ok(Inserted::AlreadyExists(job))
        }
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Option<JobPosting>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Exact, case-sensitive title lookup.
    pub async fn find_job_by_title(&self, title: &str) -> Result<Option<JobPosting>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM jobs WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobPosting>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM jobs ORDER BY created_at DESC, rowid DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    // ── Candidates ──────────────────────────────────────────────────────────

    pub async fn insert_candidate(
        &self,
        candidate: NewCandidate<'_>,
    ) -> Result<Inserted<CandidateProfile>, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO candidates (id, name, email, phone, source_path, extracted_profile, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_path) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate.name)
        .bind(candidate.email)
        .bind(candidate.phone)
        .bind(candidate.source_path)
        .bind(candidate.extracted_profile.map(Json))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let stored = self
            .find_candidate_by_source(candidate.source_path)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow!(
                    "candidate for '{}' missing after insert",
                    candidate.source_path
                ))
            })?;

        if result.rows_affected() == 1 {
            info!("Stored candidate {} '{}'", stored.id, stored.name);
            Ok(Inserted::Created(stored))
        } else {
            Ok(Inserted::AlreadyExists(stored))
        }
    }

    pub async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateProfile>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM candidates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_candidate_by_source(
        &self,
        source_path: &str,
    ) -> Result<Option<CandidateProfile>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM candidates WHERE source_path = ?")
            .bind(source_path)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_candidates(&self) -> Result<Vec<CandidateProfile>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM candidates ORDER BY created_at DESC, rowid DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    // ── Matches ─────────────────────────────────────────────────────────────

    /// Persists a scored pair. A second insert for the same pair writes
    /// nothing and returns the existing row.
    pub async fn insert_match(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
        result: &MatchResult,
    ) -> Result<Inserted<MatchRow>, AppError> {
        let outcome = sqlx::query(
            r#"
            INSERT INTO matches (id, job_id, candidate_id, match_score, score_breakdown, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (job_id, candidate_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(candidate_id)
        .bind(result.match_score)
        .bind(Json(result))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = self.find_match(job_id, candidate_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow!(
                "match {job_id}/{candidate_id} missing after insert"
            ))
        })?;

        if outcome.rows_affected() == 1 {
            Ok(Inserted::Created(row))
        } else {
            Ok(Inserted::AlreadyExists(row))
        }
    }

    pub async fn get_match(&self, id: Uuid) -> Result<Option<MatchRow>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_match(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Option<MatchRow>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM matches WHERE job_id = ? AND candidate_id = ?")
                .bind(job_id)
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// All (job_id, candidate_id) pairs that already have a match.
    pub async fn matched_pairs(&self) -> Result<HashSet<(Uuid, Uuid)>, AppError> {
        let pairs: Vec<(Uuid, Uuid)> = sqlx::query_as("SELECT job_id, candidate_id FROM matches")
            .fetch_all(&self.pool)
            .await?;
        Ok(pairs.into_iter().collect())
    }

    /// Matches joined with job title and candidate name/email.
    /// Filtered by job alone: best score first. Otherwise: newest first.
    pub async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<MatchListing>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT m.*, j.title AS job_title, c.name AS candidate_name, c.email AS candidate_email
            FROM matches m
            JOIN jobs j ON j.id = m.job_id
            JOIN candidates c ON c.id = m.candidate_id
            WHERE 1 = 1
            "#,
        );

        if let Some(job_id) = filter.job_id {
            query.push(" AND m.job_id = ").push_bind(job_id);
        }
        if let Some(candidate_id) = filter.candidate_id {
            query.push(" AND m.candidate_id = ").push_bind(candidate_id);
        }
        if filter.shortlisted_only {
            query.push(" AND m.is_shortlisted = TRUE");
        }

        if filter.job_id.is_some() && filter.candidate_id.is_none() {
            query.push(" ORDER BY m.match_score DESC, m.created_at DESC");
        } else {
            query.push(" ORDER BY m.created_at DESC, m.rowid DESC");
        }

        Ok(query
            .build_query_as::<MatchListing>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// Shortlisting is one-way; no operation clears the flag.
    pub async fn mark_shortlisted(&self, match_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE matches SET is_shortlisted = TRUE WHERE id = ?")
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        ensure_updated(result.rows_affected(), match_id)
    }

    /// Sets the interview date on a shortlisted, not-yet-scheduled match.
    /// Returns `false` (and writes nothing) when the match is in any other state.
    pub async fn schedule_interview(
        &self,
        match_id: Uuid,
        interview_date: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE matches
            SET interview_scheduled = TRUE, interview_date = ?
            WHERE id = ? AND is_shortlisted = TRUE AND interview_scheduled = FALSE
            "#,
        )
        .bind(interview_date)
        .bind(match_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_feedback(&self, match_id: Uuid, feedback: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE matches SET feedback = ? WHERE id = ?")
            .bind(feedback)
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        ensure_updated(result.rows_affected(), match_id)
    }

    pub async fn counts(&self) -> Result<DashboardCounts, AppError> {
        Ok(sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM jobs) AS jobs,
                (SELECT COUNT(*) FROM candidates) AS candidates,
                (SELECT COUNT(*) FROM matches) AS matches,
                (SELECT COUNT(*) FROM matches WHERE is_shortlisted) AS shortlisted,
                (SELECT COUNT(*) FROM matches WHERE interview_scheduled) AS interviews_scheduled
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }
}

fn ensure_updated(rows_affected: u64, match_id: Uuid) -> Result<(), AppError> {
    if rows_affected == 0 {
        Err(AppError::NotFound(format!("Match {match_id} not found")))
    } else {
        Ok(())
    }
}
