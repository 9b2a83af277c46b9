// crates/server/src/routes/files.rs
//! Artifact streaming.
//!
//! Files are looked up by job id across every session, and only names listed
//! in the job's manifest are served, so a request can never reach outside the
//! job directory. Range requests are answered by `ServeFile`.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    /// `download=true` asks for an attachment instead of inline playback.
    #[serde(default)]
    pub download: Option<String>,
}

impl FileQuery {
    fn wants_attachment(&self) -> bool {
        self.download.as_deref() == Some("true")
    }
}

/// GET /api/files/{job_id}/{filename}
async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path((job_id, filename)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
    request: Request,
) -> ApiResult<Response> {
    let (session_id, job) = state
        .runner
        .find_job(&job_id)
        .ok_or_else(|| ApiError::JobNotFound(job_id.clone()))?;
    if !job.files.contains(&filename) {
        return Err(ApiError::FileNotFound(filename));
    }

    let path = state.runner.layout().job_dir(&session_id, &job_id).join(&filename);
    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        let disposition = if query.wants_attachment() { "attachment" } else { "inline" };
        let value = format!("{disposition}; filename=\"{filename}\"");
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
            }
            Err(e) => tracing::warn!(job_id, filename, error = %e, "skipping content-disposition"),
        }
    }
    Ok(response.into_response())
}

/// Build the files router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/files/{job_id}/{filename}", get(serve_file))
}
