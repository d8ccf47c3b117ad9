//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::models::FileId;
use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist (or is not visible to this credential).
    #[display("file not found: {_0}")]
    NotFound(#[error(not(source))] FileId),
    /// File exists but has no downloadable content (folders, native documents).
    #[display("file has no downloadable content: {_0}")]
    NotDownloadable(#[error(not(source))] FileId),
    /// Credential rejected or lacking the required scope.
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// The remote service answered with a non-success status.
    #[display("unexpected response status: {_0}")]
    Status(#[error(not(source))] String),
    /// The remote service answered with a body we could not make sense of.
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// Connection, TLS or timeout failure talking to the remote service.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::Status(_))
    }
}
