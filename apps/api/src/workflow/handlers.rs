use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::MatchRow;
use crate::state::AppState;
use crate::workflow::{InvitationOutcome, JobShortlist};

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub interview_date: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: String,
}

/// POST /api/v1/matches/:id/shortlist
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MatchRow>, AppError> {
    Ok(Json(state.workflow.shortlist(match_id).await?))
}

/// POST /api/v1/matches/:id/schedule
///
/// Schedules the interview and sends the invitation. The schedule stands
/// even when the email fails; `delivery` reports what happened.
pub async fn handle_schedule(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<InvitationOutcome>, AppError> {
    let outcome = state
        .invitations
        .schedule_and_invite(match_id, &request.interview_date)
        .await?;
    Ok(Json(outcome))
}

/// PUT /api/v1/matches/:id/feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<MatchRow>, AppError> {
    Ok(Json(
        state
            .workflow
            .record_feedback(match_id, &request.feedback)
            .await?,
    ))
}

/// POST /api/v1/matches/:id/resend
pub async fn handle_resend(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<InvitationOutcome>, AppError> {
    Ok(Json(state.invitations.resend_invitation(match_id).await?))
}

/// POST /api/v1/matches/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<InvitationOutcome>, AppError> {
    Ok(Json(state.invitations.send_rejection(match_id).await?))
}

/// GET /api/v1/interviews
///
/// Shortlisted matches grouped by job.
pub async fn handle_interviews(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobShortlist>>, AppError> {
    Ok(Json(state.workflow.shortlisted_by_job().await?))
}
