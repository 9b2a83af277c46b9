// crates/server/src/lib.rs
//! Stemtool server library.
//!
//! Axum HTTP surface over `stemtool-core`: job creation and polling scoped to
//! a caller session, artifact streaming, and optional hosting of the
//! frontend build.

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderName;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, process, jobs, files)
/// - CORS allowing any origin, exposing the session header
/// - Request tracing
/// - The frontend build as a fallback when `static_dir` is given; unknown
///   paths get its `index.html` so client-side routing works
pub fn create_app(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("x-session-id")]);

    let mut app = Router::new().merge(api_routes(state));

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        tracing::info!(path = %dir.display(), "serving static files");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use stemtool_core::adapters::{DemucsAdapter, YtDlpAdapter};
    use stemtool_core::{JobRunner, RunnerConfig};
    use tower::ServiceExt;

    fn app(static_dir: Option<PathBuf>, data: &tempfile::TempDir) -> Router {
        // the real adapters are never reached by these requests
        let runner = JobRunner::new(
            RunnerConfig {
                data_dir: data.path().to_path_buf(),
                ..RunnerConfig::default()
            },
            Arc::new(YtDlpAdapter::default()),
            Arc::new(DemucsAdapter::default()),
        );
        create_app(AppState::new(Arc::new(runner)), static_dir)
    }

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint_response_structure() {
        let data = tempfile::tempdir().unwrap();
        let (status, body) = get(app(None, &data), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].is_string());
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn test_cors_preflight_exposes_session_header() {
        let data = tempfile::tempdir().unwrap();
        let response = app(None, &data)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/jobs")
                    .header("Origin", "http://localhost:3000")
                    .header("Access-Control-Request-Method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_index() {
        let data = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join("index.html"), "<html>app</html>").unwrap();
        std::fs::write(site.path().join("app.js"), "console.log(1)").unwrap();

        let (status, body) = get(app(Some(site.path().to_path_buf()), &data), "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");

        let (status, body) = get(app(Some(site.path().to_path_buf()), &data), "/library/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn test_unknown_api_path_without_static_dir_is_404() {
        let data = tempfile::tempdir().unwrap();
        let (status, _) = get(app(None, &data), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
