// crates/server/src/session.rs
//! Caller session propagation.
//!
//! Clients send their token in `x-session-id`. Unknown or missing tokens get
//! a fresh id, and every response carries the resolved id back in the same
//! header so the client can replay it.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

pub const SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Resolved session id, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct CallerSession(pub String);

pub async fn attach_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(&SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let session_id = state.runner.resolve_session(token);

    request
        .extensions_mut()
        .insert(CallerSession(session_id.clone()));
    let mut response = next.run(request).await;

    match HeaderValue::from_str(&session_id) {
        Ok(value) => {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
        Err(e) => tracing::warn!(session_id, error = %e, "session id is not a valid header value"),
    }
    response
}
