//! Error types for queue operations and file transfers.

use std::path::PathBuf;

use thiserror::Error;

use super::config::{MAX_ACTIVE, MIN_ACTIVE};
use crate::fetch::FetchError;

/// Errors returned by [`DownloadQueue`](super::DownloadQueue) construction
/// and id-addressed operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// `max_active` outside the allowed range.
    #[error("invalid max_active {value}: must be between {MIN_ACTIVE} and {MAX_ACTIVE}")]
    InvalidMaxActive {
        /// The rejected value.
        value: usize,
    },

    /// The stall timeout floor is zero.
    #[error("stall timeout floor must be greater than zero")]
    InvalidStallTimeout,

    /// The staging suffix is empty or contains a path separator.
    #[error("invalid staging suffix {suffix:?}")]
    InvalidStagingSuffix {
        /// The rejected suffix.
        suffix: String,
    },

    /// The queue was created outside a Tokio runtime.
    #[error("download queue must be created inside a Tokio runtime")]
    NoRuntime,

    /// No task with this id is in the list.
    #[error("task {id} not found")]
    TaskNotFound {
        /// The requested id.
        id: u64,
    },
}

/// Reasons a transfer resolves `fail`.
///
/// These never leave the queue; the message ends up in
/// [`Task::error`](super::Task::error).
#[derive(Debug, Error)]
pub enum TransferError {
    /// The request was rejected before any body was received.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The body ended before the declared length.
    #[error("incomplete transfer from {url}: expected {expected} bytes, received {received}")]
    Incomplete {
        /// Source URL.
        url: String,
        /// Declared `Content-Length`.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// The body stream failed mid-transfer.
    #[error("error reading body from {url}: {source}")]
    Body {
        /// Source URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// A filesystem operation failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Creates an incomplete-body error.
    pub fn incomplete(url: impl Into<String>, expected: u64, received: u64) -> Self {
        Self::Incomplete {
            url: url.into(),
            expected,
            received,
        }
    }

    /// Creates a body stream error.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Creates a filesystem error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
