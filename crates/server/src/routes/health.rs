// crates/server/src/routes/health.rs
//! `GET /api/health`: liveness for load balancers and the frontend's
//! startup check. Never touches the job store and never mints a session.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct Liveness {
    /// Always `"ok"` while the process can answer.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_secs: u64,
}

impl Liveness {
    fn now(uptime_secs: u64) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
        }
    }
}

async fn liveness(State(state): State<Arc<AppState>>) -> Json<Liveness> {
    Json(Liveness::now(state.uptime_secs()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(liveness))
}
