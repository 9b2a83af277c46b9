//! Record-then-directory deletion shared by explicit deletes, expiry timers
//! and the sweeper.

use super::store::{JobStore, RemovedJob};
use crate::error::StoreError;
use crate::layout::{remove_tree, DataLayout};

/// Remove the job record, then its directory.
///
/// The record goes first so no new reader can find the job; a file read that
/// already holds a descriptor finishes with complete bytes. A failed
/// directory removal is logged and left for the orphan sweep.
pub async fn reclaim_job(
    store: &JobStore,
    layout: &DataLayout,
    session_id: &str,
    job_id: &str,
) -> Result<RemovedJob, StoreError> {
    let removed = store.remove_job(session_id, job_id)?;
    let dir = layout.job_dir(session_id, job_id);
    if let Err(e) = remove_tree(&dir).await {
        tracing::warn!(
            session_id,
            job_id,
            path = %dir.display(),
            error = %e,
            "failed to remove job directory"
        );
    }
    tracing::info!(
        session_id,
        job_id,
        status = removed.job.status.as_str(),
        session_removed = removed.session_removed,
        "job deleted"
    );
    Ok(removed)
}
