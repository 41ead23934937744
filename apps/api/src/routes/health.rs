use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;
use crate::store::DashboardCounts;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "recruitflow-api"
    }))
}

/// GET /api/v1/dashboard
pub async fn dashboard_handler(
    State(state): State<AppState>,
) -> Result<Json<DashboardCounts>, AppError> {
    Ok(Json(state.store.counts().await?))
}
