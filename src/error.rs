//! Error types for the hoist library.

use thiserror::Error;

use crate::task::TaskId;

/// Errors that can occur during upload and file-management operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error reading a local byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a status outside [200, 300).
    #[error("server rejected request: {status} {status_text}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason phrase for the status, empty when unknown.
        status_text: String,
    },

    /// Retry was requested for a task id that is not in the retry store.
    #[error("no failed task with id {0}")]
    UnknownTask(TaskId),

    /// A server URL or destination path could not be turned into a URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// A specialized `Result` type for hoist operations.
pub type Result<T> = std::result::Result<T, Error>;
