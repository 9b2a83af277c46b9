// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::JobId;

/// Errors returned by the session registry / job store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request did not carry a usable source URL.
    #[error("{0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Errors raised while a job's external processes run.
///
/// The `Display` text of each variant is what ends up in a failed job's
/// `error` field, so it is written for end users.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Unsupported source URL: {0}")]
    UnsupportedSource(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp exited with code {}", display_code(.code))]
    DownloadFailed { code: Option<i32> },

    #[error("No audio file found after download")]
    NoOutput,

    #[error("Demucs exited with code {}", display_code(.code))]
    SeparationFailed { code: Option<i32> },

    #[error("No stems found after separation")]
    NoStems,

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Exit codes are absent when the child was killed by a signal.
fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
