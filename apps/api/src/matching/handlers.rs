use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::spawn_cancellable;
use crate::errors::AppError;
use crate::matching::MatchRunReport;
use crate::models::{MatchListing, MatchRow, ScoreBand};
use crate::state::AppState;
use crate::store::MatchFilter;
use crate::workflow::MatchState;

#[derive(Debug, Deserialize)]
pub struct MatchPairRequest {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MatchListingView {
    #[serde(flatten)]
    pub listing: MatchListing,
    pub band: ScoreBand,
}

#[derive(Debug, Serialize)]
pub struct MatchView {
    #[serde(flatten)]
    pub record: MatchRow,
    pub state: MatchState,
    pub band: ScoreBand,
}

impl From<MatchRow> for MatchView {
    fn from(record: MatchRow) -> Self {
        Self {
            state: MatchState::of(&record),
            band: ScoreBand::of(record.match_score),
            record,
        }
    }
}

/// POST /api/v1/matches/run
///
/// Scores every unmatched job × candidate pair. Disconnecting cancels the
/// run before its next pair.
pub async fn handle_run_matching(
    State(state): State<AppState>,
) -> Result<Json<MatchRunReport>, AppError> {
    let engine = state.engine.clone();
    let report = spawn_cancellable(move |cancel| async move { engine.run(&cancel).await }).await?;
    Ok(Json(report))
}

/// GET /api/v1/matches?job_id=&candidate_id=&shortlisted_only=
pub async fn handle_list_matches(
    State(state): State<AppState>,
    Query(filter): Query<MatchFilter>,
) -> Result<Json<Vec<MatchListingView>>, AppError> {
    let listings = state.store.list_matches(filter).await?;
    Ok(Json(
        listings
            .into_iter()
            .map(|listing| MatchListingView {
                band: ScoreBand::of(listing.record.match_score),
                listing,
            })
            .collect(),
    ))
}

/// POST /api/v1/matches/pair
pub async fn handle_match_pair(
    State(state): State<AppState>,
    Json(request): Json<MatchPairRequest>,
) -> Result<(StatusCode, Json<MatchView>), AppError> {
    let inserted = state
        .engine
        .match_pair(request.job_id, request.candidate_id)
        .await?;
    let status = if inserted.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(inserted.into_inner().into())))
}

/// GET /api/v1/matches/:id
pub async fn handle_get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(state.workflow.get(match_id).await?.into()))
}
