// crates/core/src/jobs/store.rs
//! Session registry and per-session job store.
//!
//! Everything lives behind a single `std::sync::Mutex`; the lock is never held
//! across an `.await`, and callers only ever receive cloned records.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Job, JobId, SessionId};
use crate::error::StoreError;

/// Result of removing a job record.
#[derive(Debug, Clone)]
pub struct RemovedJob {
    pub job: Job,
    /// The job was the last one in its session, which is gone as well.
    pub session_removed: bool,
}

#[derive(Default)]
pub struct JobStore {
    sessions: Mutex<HashMap<SessionId, HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, HashMap<JobId, Job>>> {
        self.sessions.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::error!("job store mutex poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }

    /// Return the caller's session id, minting a new one when `token` is
    /// absent or unknown.
    ///
    /// A minted session is not registered until its first job is created.
    pub fn resolve_session(&self, token: Option<&str>) -> SessionId {
        if let Some(token) = token {
            if self.sessions().contains_key(token) {
                return token.to_string();
            }
        }
        Uuid::new_v4().to_string()
    }

    /// Allocate a `starting` job in `session_id`, creating the session if
    /// needed. `url` must already be validated.
    pub fn create_job(&self, session_id: &str, url: impl Into<String>) -> Job {
        let job = Job::new(Uuid::new_v4().to_string(), session_id.to_string(), url.into());
        self.sessions()
            .entry(session_id.to_string())
            .or_default()
            .insert(job.id.clone(), job.clone());
        job
    }

    pub fn get_job(&self, session_id: &str, job_id: &str) -> Result<Job, StoreError> {
        self.sessions()
            .get(session_id)
            .and_then(|jobs| jobs.get(job_id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))
    }

    /// Jobs of one session, most recently created first.
    pub fn list_jobs(&self, session_id: &str) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .sessions()
            .get(session_id)
            .map(|jobs| jobs.values().cloned().collect())
            .unwrap_or_default();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    /// Apply `mutate` to a copy of the record and publish it as a whole.
    ///
    /// A missing record is reported as `NotFound` and nothing is written, so
    /// an orchestration racing a delete can never resurrect the job.
    pub fn update_job<F>(&self, session_id: &str, job_id: &str, mutate: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut sessions = self.sessions();
        let slot = sessions
            .get_mut(session_id)
            .and_then(|jobs| jobs.get_mut(job_id))
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        let mut next = slot.clone();
        mutate(&mut next);
        *slot = next.clone();
        Ok(next)
    }

    /// Remove a job; the session goes with it if this was its last job.
    pub fn remove_job(&self, session_id: &str, job_id: &str) -> Result<RemovedJob, StoreError> {
        let mut sessions = self.sessions();
        let jobs = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        let job = jobs
            .remove(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        let session_removed = jobs.is_empty();
        if session_removed {
            sessions.remove(session_id);
        }
        Ok(RemovedJob {
            job,
            session_removed,
        })
    }

    /// Read-only lookup across every session (file downloads carry no
    /// session token).
    pub fn find_job(&self, job_id: &str) -> Option<(SessionId, Job)> {
        self.sessions().iter().find_map(|(session_id, jobs)| {
            jobs.get(job_id)
                .map(|job| (session_id.clone(), job.clone()))
        })
    }

    /// `(session, job)` pairs whose expiry is at or before `now`.
    pub fn expired_jobs(&self, now: DateTime<Utc>) -> Vec<(SessionId, JobId)> {
        self.sessions()
            .iter()
            .flat_map(|(session_id, jobs)| {
                jobs.values()
                    .filter(|job| job.is_expired(now))
                    .map(move |job| (session_id.clone(), job.id.clone()))
            })
            .collect()
    }

    pub fn contains_session(&self, session_id: &str) -> bool {
        self.sessions().contains_key(session_id)
    }

    pub fn contains_job(&self, session_id: &str, job_id: &str) -> bool {
        self.sessions()
            .get(session_id)
            .is_some_and(|jobs| jobs.contains_key(job_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://www.youtube.com/watch?v=abc123";

    #[test]
    fn test_resolve_session_mints_for_absent_or_unknown_token() {
        let store = JobStore::new();
        let minted = store.resolve_session(None);
        assert!(!minted.is_empty());
        assert_ne!(store.resolve_session(Some("stale")), "stale");
        // minted sessions do not exist until they own a job
        assert!(!store.contains_session(&minted));
    }

    #[test]
    fn test_resolve_session_keeps_known_token() {
        let store = JobStore::new();
        let session = store.resolve_session(None);
        store.create_job(&session, URL);
        assert_eq!(store.resolve_session(Some(&session)), session);
    }

    #[test]
    fn test_create_and_get_job() {
        let store = JobStore::new();
        let job = store.create_job("s", URL);

        let fetched = store.get_job("s", &job.id).unwrap();
        assert_eq!(fetched, job);
        assert_eq!(fetched.status, JobStatus::Starting);
        assert_eq!(fetched.session_id, "s");
        assert_eq!(
            store.get_job("other", &job.id),
            Err(StoreError::NotFound(job.id.clone()))
        );
    }

    #[test]
    fn test_list_jobs_newest_first_and_scoped_to_session() {
        let store = JobStore::new();
        let first = store.create_job("a", URL);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create_job("a", URL);
        let foreign = store.create_job("b", URL);

        let ids: Vec<_> = store.list_jobs("a").into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let ids: Vec<_> = store.list_jobs("b").into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![foreign.id]);

        assert!(store.list_jobs("unknown").is_empty());
    }

    #[test]
    fn test_update_job_replaces_record() {
        let store = JobStore::new();
        let job = store.create_job("s", URL);

        let updated = store
            .update_job("s", &job.id, |job| {
                job.begin_download();
                job.advance_progress(12);
            })
            .unwrap();
        assert_eq!(updated.status, JobStatus::Downloading);
        assert_eq!(store.get_job("s", &job.id).unwrap(), updated);
    }

    #[test]
    fn test_update_missing_job_does_not_resurrect() {
        let store = JobStore::new();
        let job = store.create_job("s", URL);
        store.remove_job("s", &job.id).unwrap();

        let result = store.update_job("s", &job.id, |job| job.advance_progress(50));
        assert_eq!(result, Err(StoreError::NotFound(job.id.clone())));
        assert!(!store.contains_job("s", &job.id));
        assert!(!store.contains_session("s"));
    }

    #[test]
    fn test_remove_last_job_removes_session() {
        let store = JobStore::new();
        let a = store.create_job("s", URL);
        let b = store.create_job("s", URL);

        let removed = store.remove_job("s", &a.id).unwrap();
        assert!(!removed.session_removed);
        assert!(store.contains_session("s"));

        let removed = store.remove_job("s", &b.id).unwrap();
        assert!(removed.session_removed);
        assert!(!store.contains_session("s"));
        assert_eq!(
            store.remove_job("s", &b.id).unwrap_err(),
            StoreError::NotFound(b.id.clone())
        );
    }

    #[test]
    fn test_find_job_across_sessions() {
        let store = JobStore::new();
        store.create_job("a", URL);
        let job = store.create_job("b", URL);

        let (session, found) = store.find_job(&job.id).unwrap();
        assert_eq!(session, "b");
        assert_eq!(found.id, job.id);
        assert!(store.find_job("missing").is_none());
    }

    #[test]
    fn test_expired_jobs_only_completed_past_expiry() {
        let store = JobStore::new();
        let now = Utc::now();
        let done = store.create_job("s", URL);
        let fresh = store.create_job("s", URL);
        let failed = store.create_job("s", URL);

        store
            .update_job("s", &done.id, |job| {
                job.complete(vec!["vocals.wav".into()], now - chrono::Duration::seconds(1))
            })
            .unwrap();
        store
            .update_job("s", &fresh.id, |job| {
                job.complete(vec!["vocals.wav".into()], now + chrono::Duration::minutes(10))
            })
            .unwrap();
        store
            .update_job("s", &failed.id, |job| job.fail("boom"))
            .unwrap();

        assert_eq!(store.expired_jobs(now), vec![("s".to_string(), done.id)]);
    }
}
