// crates/server/src/routes/jobs.rs
//! Job creation, polling and deletion, scoped to the caller's session.
//!
//! - POST   /process        - validate a source URL and start a job
//! - GET    /jobs           - list the caller's jobs, newest first
//! - GET    /jobs/{job_id}  - one job's status
//! - DELETE /jobs/{job_id}  - delete a job and its files

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use stemtool_core::Job;

use crate::error::ApiResult;
use crate::session::CallerSession;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize))]
pub struct ProcessResponse {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct DeleteResponse {
    pub message: String,
}

/// POST /api/process - start a job for the given URL.
///
/// A missing or unparseable body is treated as a missing URL.
async fn create_job(
    State(state): State<Arc<AppState>>,
    Extension(CallerSession(session_id)): Extension<CallerSession>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<ProcessResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let job = state.runner.create_job(&session_id, request.url.as_deref())?;
    Ok(Json(ProcessResponse {
        job_id: job.id,
        status: "started".to_string(),
    }))
}

/// GET /api/jobs - jobs in the caller's session; empty for a new session.
async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Extension(CallerSession(session_id)): Extension<CallerSession>,
) -> Json<Vec<Job>> {
    Json(state.runner.list_jobs(&session_id))
}

/// GET /api/jobs/{job_id}
async fn get_job(
    State(state): State<Arc<AppState>>,
    Extension(CallerSession(session_id)): Extension<CallerSession>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(state.runner.get_job(&session_id, &job_id)?))
}

/// DELETE /api/jobs/{job_id}
async fn delete_job(
    State(state): State<Arc<AppState>>,
    Extension(CallerSession(session_id)): Extension<CallerSession>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    state.runner.delete_job(&session_id, &job_id).await?;
    Ok(Json(DeleteResponse {
        message: "Job deleted successfully".to_string(),
    }))
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process", post(create_job))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{job_id}", get(get_job).delete(delete_job))
}
