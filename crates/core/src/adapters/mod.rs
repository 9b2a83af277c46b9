// crates/core/src/adapters/mod.rs
//! External process adapters.
//!
//! Each adapter wraps one long-running child process and exposes it as an
//! async call that reports fractional progress and resolves to the names of
//! the files it produced inside `output_dir`.
//!
//! Implementations:
//! - [`YtDlpAdapter`] - downloads and extracts the source audio
//! - [`DemucsAdapter`] - separates the audio into stems

pub mod demucs;
pub mod process;
pub mod progress;
pub mod ytdlp;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AdapterError;

pub use demucs::{DemucsAdapter, DemucsConfig};
pub use ytdlp::{YtDlpAdapter, YtDlpConfig};

/// Progress callback; receives a fraction in `0.0..=1.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// A progress callback that discards every update.
#[cfg(test)]
pub(crate) fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

#[async_trait]
pub trait ProcessAdapter: Send + Sync {
    /// Run the process to completion.
    ///
    /// `input` is the source URL for the downloader and the path of the
    /// downloaded audio for the separator. Every returned filename is
    /// relative to `output_dir` and already exists when this resolves.
    async fn run(
        &self,
        input: &str,
        output_dir: &Path,
        on_progress: ProgressFn,
    ) -> Result<Vec<String>, AdapterError>;

    /// Adapter name for logging (e.g. "yt-dlp", "demucs").
    fn name(&self) -> &str;
}
