//! Task snapshots, statuses and change events.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::filename::filename_from_url;

/// Lifecycle state of a task.
///
/// `new -> waiting -> loading -> {success | fail | aborted}`; a resume can
/// move `fail` and `aborted` back to `waiting` or `loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Under construction, never observable through the queue API.
    New,
    /// Admitted but waiting for a free slot.
    Waiting,
    /// Transfer in flight.
    Loading,
    /// Stopped by the user.
    Aborted,
    /// File materialized at its target path.
    Success,
    /// Transfer failed; see [`Task::error`].
    Fail,
}

impl TaskStatus {
    /// Returns the lower-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Waiting => "waiting",
            Self::Loading => "loading",
            Self::Aborted => "aborted",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    /// True for `waiting` and `loading`, the states the queue still has
    /// work for.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Waiting | Self::Loading)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one download task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Process-unique id, assigned in creation order.
    pub id: u64,
    /// Source URL.
    pub url: String,
    /// Directory the file is written into.
    pub target_directory: PathBuf,
    /// Decoded, sanitized last URL segment.
    pub filename: String,
    /// Final location of the file.
    pub target_file_path: PathBuf,
    /// In-flight location of the file.
    pub staging_path: PathBuf,
    /// 0-100; reset on every (re)start.
    pub progress: u8,
    /// Current state.
    pub status: TaskStatus,
    /// Stall and transport restarts since the task last entered `loading`.
    pub restarts: u32,
    /// Message of the last failure.
    pub error: Option<String>,
}

impl Task {
    pub(crate) fn new(id: u64, url: &str, target_directory: &Path, staging_suffix: &str) -> Self {
        let filename = filename_from_url(url);
        let target_file_path = target_directory.join(&filename);
        let staging_path = target_directory.join(format!("{filename}{staging_suffix}"));
        Self {
            id,
            url: url.to_string(),
            target_directory: target_directory.to_path_buf(),
            filename,
            target_file_path,
            staging_path,
            progress: 0,
            status: TaskStatus::New,
            restarts: 0,
            error: None,
        }
    }

    pub(crate) fn event(&self) -> TaskEvent {
        TaskEvent {
            id: self.id,
            status: self.status,
            progress: self.progress,
        }
    }
}

/// Published on every status or progress change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEvent {
    /// Task id.
    pub id: u64,
    /// Status after the change.
    pub status: TaskStatus,
    /// Progress after the change.
    pub progress: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_derives_paths() {
        let task = Task::new(
            7,
            "https://a.example/IGCSE/0625_s21_qp_12.pdf",
            Path::new("/tmp/papers"),
            ".downloading",
        );
        assert_eq!(task.filename, "0625_s21_qp_12.pdf");
        assert_eq!(
            task.target_file_path,
            PathBuf::from("/tmp/papers/0625_s21_qp_12.pdf")
        );
        assert_eq!(
            task.staging_path,
            PathBuf::from("/tmp/papers/0625_s21_qp_12.pdf.downloading")
        );
        assert_eq!(task.status, TaskStatus::New);
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(TaskStatus::Loading.to_string(), "loading");
        assert_eq!(
            serde_json::to_string(&TaskStatus::Success).ok().as_deref(),
            Some("\"success\"")
        );
    }

    #[test]
    fn test_pending_statuses() {
        assert!(TaskStatus::Waiting.is_pending());
        assert!(TaskStatus::Loading.is_pending());
        assert!(!TaskStatus::Fail.is_pending());
        assert!(!TaskStatus::Aborted.is_pending());
    }
}
