//! On-disk layout: `<root>/<session-id>/<job-id>/`.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    pub fn job_dir(&self, session_id: &str, job_id: &str) -> PathBuf {
        self.session_dir(session_id).join(job_id)
    }

    /// Create the data root if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }
}

/// Remove a directory tree; a tree that is already gone counts as removed.
pub async fn remove_tree(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// List the subdirectories of `dir` by raw name, including names that are
/// not valid UTF-8 and so can never be a session or job id.
pub async fn list_subdirs(dir: &Path) -> io::Result<Vec<(OsString, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push((entry.file_name(), entry.path()));
        }
    }
    Ok(dirs)
}
