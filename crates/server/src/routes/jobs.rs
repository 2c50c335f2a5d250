// crates/server/src/routes/jobs.rs
// Polling and cancellation endpoints. Jobs are started by embedding
// code, not over HTTP, so this surface is read-mostly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use jobwatch_core::JobView;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub job_id: String,
    pub canceling: bool,
}

/// GET /api/jobs/{id}
///
/// Current state of a job: live counters plus the derived completion
/// percentage.
async fn job_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let view = state.supervisor.get_status(&id).await?;
    Ok(Json(view))
}

/// POST /api/jobs/{id}/cancel
///
/// Record cancellation intent. The flag is advisory; the job keeps
/// running until its own work notices and stops.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    state.supervisor.request_cancel(&id).await?;
    Ok(Json(CancelResponse {
        job_id: id,
        canceling: true,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs/{id}", get(job_progress))
        .route("/jobs/{id}/cancel", post(cancel_job))
}
