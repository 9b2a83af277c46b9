// crates/core/src/jobs/runner.rs
//! Entry point the request layer talks to. Owns the store, the orchestrator
//! and the sweeper, and hands out cloned job records.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::orchestrator::JobOrchestrator;
use super::reclaim::reclaim_job;
use super::store::{JobStore, RemovedJob};
use super::sweeper::CleanupSweeper;
use super::types::{Job, SessionId};
use crate::adapters::ProcessAdapter;
use crate::error::StoreError;
use crate::layout::DataLayout;
use crate::source::validate_source_url;

pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub data_dir: PathBuf,
    /// How long a completed job is kept.
    pub job_ttl: Duration,
    pub sweep_interval: Duration,
    /// Pipelines allowed to run at once; `None` or `Some(0)` is unbounded.
    pub max_concurrent_jobs: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            job_ttl: DEFAULT_JOB_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_concurrent_jobs: std::thread::available_parallelism()
                .ok()
                .map(|n| n.get()),
        }
    }
}

pub struct JobRunner {
    store: Arc<JobStore>,
    layout: DataLayout,
    orchestrator: Arc<JobOrchestrator>,
    sweeper: Arc<CleanupSweeper>,
}

impl JobRunner {
    pub fn new(
        config: RunnerConfig,
        downloader: Arc<dyn ProcessAdapter>,
        separator: Arc<dyn ProcessAdapter>,
    ) -> Self {
        let store = Arc::new(JobStore::new());
        let layout = DataLayout::new(config.data_dir);
        tracing::debug!(
            downloader = downloader.name(),
            separator = separator.name(),
            max_concurrent_jobs = ?config.max_concurrent_jobs,
            "job runner configured"
        );
        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::clone(&store),
            layout.clone(),
            downloader,
            separator,
            config.max_concurrent_jobs,
            config.job_ttl,
        ));
        let sweeper = Arc::new(CleanupSweeper::new(
            Arc::clone(&store),
            layout.clone(),
            config.sweep_interval,
        ));
        Self {
            store,
            layout,
            orchestrator,
            sweeper,
        }
    }

    pub fn resolve_session(&self, token: Option<&str>) -> SessionId {
        self.store.resolve_session(token)
    }

    /// Validate `url`, allocate a job and start processing it in the
    /// background. Returns the freshly created `starting` record.
    pub fn create_job(&self, session_id: &str, url: Option<&str>) -> Result<Job, StoreError> {
        let url = validate_source_url(url)?;
        let job = self.store.create_job(session_id, url);
        tracing::info!(session_id, job_id = %job.id, "job created");
        self.orchestrator.spawn(&job);
        Ok(job)
    }

    pub fn get_job(&self, session_id: &str, job_id: &str) -> Result<Job, StoreError> {
        self.store.get_job(session_id, job_id)
    }

    pub fn list_jobs(&self, session_id: &str) -> Vec<Job> {
        self.store.list_jobs(session_id)
    }

    /// Delete the job record and its directory. A running pipeline keeps
    /// going until its next store update, which then finds nothing.
    pub async fn delete_job(&self, session_id: &str, job_id: &str) -> Result<RemovedJob, StoreError> {
        reclaim_job(&self.store, &self.layout, session_id, job_id).await
    }

    /// Look a job up in any session.
    pub fn find_job(&self, job_id: &str) -> Option<(SessionId, Job)> {
        self.store.find_job(job_id)
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn sweeper(&self) -> Arc<CleanupSweeper> {
        Arc::clone(&self.sweeper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ProgressFn;
    use crate::error::AdapterError;
    use crate::jobs::JobStatus;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    struct Writes(&'static [&'static str]);

    #[async_trait]
    impl ProcessAdapter for Writes {
        async fn run(
            &self,
            _input: &str,
            output_dir: &Path,
            on_progress: ProgressFn,
        ) -> Result<Vec<String>, AdapterError> {
            for name in self.0 {
                let path = output_dir.join(name);
                tokio::fs::write(&path, b"RIFF")
                    .await
                    .map_err(|e| AdapterError::filesystem(path, e))?;
            }
            on_progress(1.0);
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }

        fn name(&self) -> &str {
            "writes"
        }
    }

    fn runner(tmp: &tempfile::TempDir) -> JobRunner {
        JobRunner::new(
            RunnerConfig {
                data_dir: tmp.path().to_path_buf(),
                ..RunnerConfig::default()
            },
            Arc::new(Writes(&["audio.wav"])),
            Arc::new(Writes(&["vocals.wav", "other.wav"])),
        )
    }

    async fn wait_terminal(runner: &JobRunner, session: &str, job: &str) -> Job {
        for _ in 0..200 {
            let current = runner.get_job(session, job).unwrap();
            if current.status.is_terminal() {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job} never finished");
    }

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.job_ttl, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert!(config.max_concurrent_jobs.is_some_and(|n| n > 0));
    }

    #[tokio::test]
    async fn test_create_job_runs_to_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner(&tmp);
        let session = runner.resolve_session(None);

        let job = runner
            .create_job(&session, Some("  https://youtu.be/abc123  "))
            .unwrap();
        assert_eq!(job.url, "https://youtu.be/abc123");
        assert_eq!(job.progress, 0);

        let done = wait_terminal(&runner, &session, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(
            done.files.stems,
            Some(vec!["vocals.wav".to_string(), "other.wav".to_string()])
        );
        assert_eq!(runner.resolve_session(Some(&session)), session);
    }

    #[tokio::test]
    async fn test_invalid_url_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner(&tmp);

        let missing = runner.create_job("s", None).unwrap_err();
        assert_eq!(missing.to_string(), "YouTube URL is required");
        let invalid = runner.create_job("s", Some("https://example.com/v")).unwrap_err();
        assert_eq!(invalid.to_string(), "Invalid YouTube URL");

        assert!(runner.list_jobs("s").is_empty());
        assert_ne!(runner.resolve_session(Some("s")), "s");
    }

    #[tokio::test]
    async fn test_delete_removes_record_directory_and_empty_session() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner(&tmp);
        let job = runner.create_job("s", Some("https://youtu.be/abc123")).unwrap();
        wait_terminal(&runner, "s", &job.id).await;

        let removed = runner.delete_job("s", &job.id).await.unwrap();
        assert!(removed.session_removed);
        assert!(!runner.layout().job_dir("s", &job.id).exists());
        assert!(matches!(
            runner.get_job("s", &job.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            runner.delete_job("s", &job.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_job_across_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner(&tmp);
        let job = runner.create_job("a", Some("https://youtu.be/abc123")).unwrap();

        let (session, found) = runner.find_job(&job.id).unwrap();
        assert_eq!(session, "a");
        assert_eq!(found.id, job.id);
        assert!(runner.get_job("b", &job.id).is_err());
        assert!(runner.find_job("nope").is_none());
    }
}
