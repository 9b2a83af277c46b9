//! API route handlers for the stemtool server.

pub mod files;
pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::{middleware, Router};

use crate::session::attach_session;
use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET    /api/health - Health check
/// - POST   /api/process - Start a job for a source URL
/// - GET    /api/jobs - List the caller's jobs
/// - GET    /api/jobs/{job_id} - Job status
/// - DELETE /api/jobs/{job_id} - Delete a job and its files
/// - GET    /api/files/{job_id}/{filename} - Stream a job artifact
///
/// Job routes resolve the caller's session from `x-session-id` and echo it
/// back; health and file routes are not session-scoped.
pub fn api_routes(state: Arc<AppState>) -> Router {
    let session_scoped = jobs::router().route_layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        attach_session,
    ));

    Router::new()
        .nest("/api", health::router())
        .nest("/api", session_scoped)
        .nest("/api", files::router())
        .with_state(state)
}
