// crates/core/src/jobs/orchestrator.rs
//! Drives a single job from `starting` to a terminal state.
//!
//! Download progress fills points 0–30, separation 30–100. Every status or
//! progress change is published to the store before the next step begins.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use super::reclaim::reclaim_job;
use super::store::JobStore;
use super::types::{Job, JobStatus};
use crate::adapters::{ProcessAdapter, ProgressFn};
use crate::error::{AdapterError, StoreError};
use crate::layout::{remove_tree, DataLayout};

const DOWNLOAD_SHARE: u8 = 30;

pub struct JobOrchestrator {
    store: Arc<JobStore>,
    layout: DataLayout,
    downloader: Arc<dyn ProcessAdapter>,
    separator: Arc<dyn ProcessAdapter>,
    /// `None` means no cap on concurrently running pipelines.
    permits: Option<Arc<Semaphore>>,
    job_ttl: Duration,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        layout: DataLayout,
        downloader: Arc<dyn ProcessAdapter>,
        separator: Arc<dyn ProcessAdapter>,
        max_concurrent_jobs: Option<usize>,
        job_ttl: Duration,
    ) -> Self {
        Self {
            store,
            layout,
            downloader,
            separator,
            permits: max_concurrent_jobs
                .filter(|n| *n > 0)
                .map(|n| Arc::new(Semaphore::new(n))),
            job_ttl,
        }
    }

    /// Start orchestration on a detached task and return immediately.
    pub fn spawn(self: &Arc<Self>, job: &Job) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        let session_id = job.session_id.clone();
        let job_id = job.id.clone();
        let url = job.url.clone();
        tokio::spawn(async move { this.run(&session_id, &job_id, &url).await })
    }

    /// Run the pipeline for one job. Adapter failures end here, folded into
    /// the job record.
    pub async fn run(self: &Arc<Self>, session_id: &str, job_id: &str, url: &str) {
        let _permit = match &self.permits {
            Some(permits) => match Arc::clone(permits).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return,
            },
            None => None,
        };

        let dir = self.layout.job_dir(session_id, job_id);
        match self.execute(session_id, job_id, url, &dir).await {
            Ok(true) => self.schedule_expiry(session_id, job_id),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(session_id, job_id, error = %err, "job failed");
                let message = err.to_string();
                self.publish(session_id, job_id, move |job| job.fail(message));
            }
        }
    }

    /// Returns whether the completed state was published.
    async fn execute(
        &self,
        session_id: &str,
        job_id: &str,
        url: &str,
        dir: &Path,
    ) -> Result<bool, AdapterError> {
        // a job deleted while queued never leaves `starting`
        if !self.publish(session_id, job_id, |job| job.begin_download()) {
            tracing::debug!(session_id, job_id, "job removed before start; skipping");
            return Ok(false);
        }
        if !self.prepare_job_dir(session_id, job_id, dir).await? {
            return Ok(false);
        }
        tracing::info!(session_id, job_id, "downloading");

        let on_download = self.progress_sink(session_id, job_id, 0, DOWNLOAD_SHARE);
        let original = self
            .downloader
            .run(url, dir, on_download)
            .await?
            .into_iter()
            .next()
            .ok_or(AdapterError::NoOutput)?;

        let audio_path: PathBuf = dir.join(&original);
        if !self.publish(session_id, job_id, |job| job.finish_download(original)) {
            return Ok(false);
        }
        tracing::info!(session_id, job_id, "separating");

        let on_separate = self.progress_sink(session_id, job_id, DOWNLOAD_SHARE, 100);
        let stems = self
            .separator
            .run(&audio_path.to_string_lossy(), dir, on_separate)
            .await?;
        if stems.is_empty() {
            return Err(AdapterError::NoStems);
        }

        let expires_at = chrono::Duration::from_std(self.job_ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let stem_count = stems.len();
        let published = self.publish(session_id, job_id, |job| job.complete(stems, expires_at));
        if published {
            tracing::info!(session_id, job_id, stems = stem_count, %expires_at, "job completed");
        }
        Ok(published)
    }

    /// Create the job directory. Returns false, with the directory removed
    /// again, if the job was deleted while it was being created.
    async fn prepare_job_dir(
        &self,
        session_id: &str,
        job_id: &str,
        dir: &Path,
    ) -> Result<bool, AdapterError> {
        create_job_dir(dir).await?;
        if self.store.contains_job(session_id, job_id) {
            return Ok(true);
        }
        tracing::debug!(session_id, job_id, "job removed while preparing; skipping");
        if let Err(e) = remove_tree(dir).await {
            tracing::warn!(session_id, job_id, path = %dir.display(), error = %e, "failed to remove job directory");
        }
        Ok(false)
    }

    /// Apply a mutation; a job deleted mid-run is ignored, not an error.
    fn publish<F>(&self, session_id: &str, job_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        match self.store.update_job(session_id, job_id, mutate) {
            Ok(_) => true,
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(session_id, job_id, "job deleted during orchestration");
                false
            }
            Err(err) => {
                tracing::error!(session_id, job_id, error = %err, "job update rejected");
                false
            }
        }
    }

    /// Map an adapter's `0.0..=1.0` onto `[start, end]` job progress points.
    fn progress_sink(&self, session_id: &str, job_id: &str, start: u8, end: u8) -> ProgressFn {
        let store = Arc::clone(&self.store);
        let session_id = session_id.to_string();
        let job_id = job_id.to_string();
        Arc::new(move |fraction: f64| {
            let value = scale_progress(fraction, start, end);
            // NotFound means the job was deleted; nothing to report to
            let _ = store.update_job(&session_id, &job_id, |job| {
                if !matches!(job.status, JobStatus::Starting) {
                    job.advance_progress(value);
                }
            });
        })
    }

    /// Delete the job once its TTL elapses, unless something else already did.
    fn schedule_expiry(&self, session_id: &str, job_id: &str) {
        let store = Arc::clone(&self.store);
        let layout = self.layout.clone();
        let ttl = self.job_ttl;
        let session_id = session_id.to_string();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let completed = store
                .get_job(&session_id, &job_id)
                .is_ok_and(|job| job.status == JobStatus::Completed);
            if completed {
                let _ = reclaim_job(&store, &layout, &session_id, &job_id).await;
            }
        });
    }
}

fn scale_progress(fraction: f64, start: u8, end: u8) -> u8 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let span = f64::from(end.saturating_sub(start));
    start.saturating_add((fraction * span).floor() as u8)
}

async fn create_job_dir(dir: &Path) -> Result<(), AdapterError> {
    if let Some(parent) = dir.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AdapterError::filesystem(parent, e))?;
    }
    tokio::fs::create_dir(dir)
        .await
        .map_err(|e| AdapterError::filesystem(dir, e))
}
