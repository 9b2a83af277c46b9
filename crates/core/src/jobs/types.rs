// crates/core/src/jobs/types.rs
//! Job record and its status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque job identifier, unique within its session (UUID v4 in practice).
pub type JobId = String;

/// Opaque session token issued by the server.
pub type SessionId = String;

/// Lifecycle of a job.
///
/// `Starting → Downloading → Separating → Completed`, with `Error`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Downloading,
    Separating,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Downloading => "downloading",
            JobStatus::Separating => "separating",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// Sub-status of a single pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobSteps {
    pub download: StepStatus,
    pub separate: StepStatus,
}

/// Artifacts already present in the job directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobFiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stems: Option<Vec<String>>,
}

impl JobFiles {
    /// True if `name` is one of the published artifacts.
    pub fn contains(&self, name: &str) -> bool {
        self.original.as_deref() == Some(name)
            || self
                .stems
                .as_ref()
                .is_some_and(|stems| stems.iter().any(|s| s == name))
    }
}

/// A single source-URL-to-stems request.
///
/// Records are replaced wholesale inside the store, so readers only ever see
/// a fully applied mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(skip)]
    pub session_id: SessionId,
    pub url: String,
    pub status: JobStatus,
    pub progress: u8,
    pub steps: JobSteps,
    pub files: JobFiles,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, session_id: SessionId, url: String) -> Self {
        Self {
            id,
            session_id,
            url,
            status: JobStatus::Starting,
            progress: 0,
            steps: JobSteps::default(),
            files: JobFiles::default(),
            error: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Raise progress to `value`; never lowers it and ignores terminal jobs.
    pub fn advance_progress(&mut self, value: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = self.progress.max(value.min(100));
    }

    pub fn begin_download(&mut self) {
        self.status = JobStatus::Downloading;
        self.steps.download = StepStatus::Running;
    }

    /// Record the downloaded file and move on to separation.
    pub fn finish_download(&mut self, original: String) {
        self.steps.download = StepStatus::Completed;
        self.files.original = Some(original);
        self.advance_progress(30);
        self.status = JobStatus::Separating;
        self.steps.separate = StepStatus::Running;
    }

    pub fn complete(&mut self, stems: Vec<String>, expires_at: DateTime<Utc>) {
        self.steps.separate = StepStatus::Completed;
        self.files.stems = Some(stems);
        self.progress = 100;
        self.status = JobStatus::Completed;
        self.expires_at = Some(expires_at);
    }

    /// Move to `Error`. Progress is left where it was and no expiry is set.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        match self.status {
            JobStatus::Separating => self.steps.separate = StepStatus::Error,
            _ => self.steps.download = StepStatus::Error,
        }
        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.expires_at = None;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
