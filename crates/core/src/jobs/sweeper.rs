// crates/core/src/jobs/sweeper.rs
//! Periodic cleanup: expired jobs, then on-disk directories the store no
//! longer knows about.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::reclaim::reclaim_job;
use super::store::JobStore;
use crate::layout::{list_subdirs, remove_tree, DataLayout};

/// Counts from one sweep, logged at the end of each pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_jobs: usize,
    pub orphan_sessions: usize,
    pub orphan_jobs: usize,
    pub failures: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct CleanupSweeper {
    store: Arc<JobStore>,
    layout: DataLayout,
    interval: Duration,
}

impl CleanupSweeper {
    pub fn new(store: Arc<JobStore>, layout: DataLayout, interval: Duration) -> Self {
        Self {
            store,
            layout,
            interval,
        }
    }

    /// Sweep once immediately, then every `interval`, until the handle is
    /// aborted or the runtime shuts down.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_pass(Utc::now()).await;
            }
        })
    }

    /// One full pass. Failures are counted and logged; the pass never aborts
    /// part way.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        self.sweep_expired(now, &mut report).await;
        self.sweep_orphans(&mut report).await;

        if report.is_empty() {
            tracing::debug!("cleanup pass found nothing to do");
        } else {
            tracing::info!(
                expired_jobs = report.expired_jobs,
                orphan_sessions = report.orphan_sessions,
                orphan_jobs = report.orphan_jobs,
                failures = report.failures,
                "cleanup pass finished"
            );
        }
        report
    }

    async fn sweep_expired(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        for (session_id, job_id) in self.store.expired_jobs(now) {
            // the job's own timer may have won the race
            if reclaim_job(&self.store, &self.layout, &session_id, &job_id)
                .await
                .is_ok()
            {
                report.expired_jobs += 1;
            }
        }
    }

    /// Directories are listed before the store is consulted, so a job created
    /// during the pass is either not listed yet or already in the store.
    async fn sweep_orphans(&self, report: &mut SweepReport) {
        let sessions = match list_subdirs(self.layout.root()).await {
            Ok(sessions) => sessions,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(root = %self.layout.root().display(), error = %e, "failed to list data root");
                report.failures += 1;
                return;
            }
        };

        for (name, session_dir) in sessions {
            // a name that is not UTF-8 cannot belong to any session
            let Some(session_id) = name.to_str().filter(|id| self.store.contains_session(id)) else {
                if self.remove_orphan(&session_dir, report).await {
                    report.orphan_sessions += 1;
                }
                continue;
            };

            let jobs = match list_subdirs(&session_dir).await {
                Ok(jobs) => jobs,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %session_dir.display(), error = %e, "failed to list session directory");
                    report.failures += 1;
                    continue;
                }
            };
            for (job_name, job_dir) in jobs {
                let known = job_name
                    .to_str()
                    .is_some_and(|job_id| self.store.contains_job(session_id, job_id));
                if !known && self.remove_orphan(&job_dir, report).await {
                    report.orphan_jobs += 1;
                }
            }
        }
    }

    async fn remove_orphan(&self, path: &std::path::Path, report: &mut SweepReport) -> bool {
        match remove_tree(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed orphaned directory");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove orphaned directory");
                report.failures += 1;
                false
            }
        }
    }
}
