use std::path::PathBuf;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::spawn_cancellable;
use crate::errors::AppError;
use crate::ingest::{JobLoadReport, ResumeRunReport};
use crate::models::{CandidateProfile, JobPosting};
use crate::state::AppState;
use crate::store::Inserted;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct JobCreatedResponse {
    pub created: bool,
    pub job: JobPosting,
}

#[derive(Debug, Serialize)]
pub struct CandidateCreatedResponse {
    pub created: bool,
    pub candidate: CandidateProfile,
}

fn created_status<T>(inserted: &Inserted<T>) -> StatusCode {
    if inserted.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobPosting>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobPosting>, AppError> {
    let job = state
        .store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(job))
}

/// POST /api/v1/jobs
///
/// 201 when the job was created, 200 with the stored job when the title
/// already exists.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), AppError> {
    let inserted = state
        .ingestor
        .add_job(&request.title, &request.description)
        .await?;
    let status = created_status(&inserted);
    Ok((
        status,
        Json(JobCreatedResponse {
            created: inserted.is_created(),
            job: inserted.into_inner(),
        }),
    ))
}

/// POST /api/v1/jobs/load
///
/// Loads the configured jobs file.
pub async fn handle_load_jobs(
    State(state): State<AppState>,
) -> Result<Json<JobLoadReport>, AppError> {
    let path = PathBuf::from(&state.config.jobs_file);
    Ok(Json(state.ingestor.load_jobs_file(&path).await?))
}

/// GET /api/v1/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
) -> Result<Json<Vec<CandidateProfile>>, AppError> {
    Ok(Json(state.store.list_candidates().await?))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateProfile>, AppError> {
    let candidate = state
        .store
        .get_candidate(candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
    Ok(Json(candidate))
}

/// POST /api/v1/candidates/process
///
/// Processes the configured resumes directory. Disconnecting cancels the
/// run before its next resume.
pub async fn handle_process_resumes(
    State(state): State<AppState>,
) -> Result<Json<ResumeRunReport>, AppError> {
    let ingestor = state.ingestor.clone();
    let dir = ingestor.resumes_dir().clone();
    let report = spawn_cancellable(move |cancel| async move {
        ingestor.process_resume_dir(&dir, &cancel).await
    })
    .await?;
    Ok(Json(report))
}

/// POST /api/v1/candidates/upload
///
/// Multipart form with a single `file` field holding a PDF resume.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CandidateCreatedResponse>), AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, data));
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("Missing `file` field".to_string()))?;

    let inserted = state
        .ingestor
        .process_resume_upload(&file_name, &data)
        .await?;
    let status = created_status(&inserted);
    Ok((
        status,
        Json(CandidateCreatedResponse {
            created: inserted.is_created(),
            candidate: inserted.into_inner(),
        }),
    ))
}
