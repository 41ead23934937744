pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::ingest::handlers as ingest;
use crate::matching::handlers as matching;
use crate::state::AppState;
use crate::workflow::handlers as workflow;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/dashboard", get(health::dashboard_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(ingest::handle_list_jobs).post(ingest::handle_create_job),
        )
        .route("/api/v1/jobs/load", post(ingest::handle_load_jobs))
        .route("/api/v1/jobs/:id", get(ingest::handle_get_job))
        // Candidates
        .route("/api/v1/candidates", get(ingest::handle_list_candidates))
        .route(
            "/api/v1/candidates/process",
            post(ingest::handle_process_resumes),
        )
        .route(
            "/api/v1/candidates/upload",
            post(ingest::handle_upload_resume),
        )
        .route("/api/v1/candidates/:id", get(ingest::handle_get_candidate))
        // Matching
        .route("/api/v1/matches", get(matching::handle_list_matches))
        .route("/api/v1/matches/run", post(matching::handle_run_matching))
        .route("/api/v1/matches/pair", post(matching::handle_match_pair))
        .route("/api/v1/matches/:id", get(matching::handle_get_match))
        // Workflow
        .route(
            "/api/v1/matches/:id/shortlist",
            post(workflow::handle_shortlist),
        )
        .route("/api/v1/matches/:id/schedule", post(workflow::handle_schedule))
        .route("/api/v1/matches/:id/feedback", put(workflow::handle_feedback))
        .route("/api/v1/matches/:id/resend", post(workflow::handle_resend))
        .route("/api/v1/matches/:id/reject", post(workflow::handle_reject))
        .route("/api/v1/interviews", get(workflow::handle_interviews))
        .with_state(state)
}
