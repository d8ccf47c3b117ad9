//! Codec Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, mirroring the other crates in the workspace.

use derive_more::{Display, Error};

/// A codec error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a decode failure.
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`] - the file's bytes could not be fetched.
/// - [`ErrorKind::Join`] - the blocking decode task panicked or was cancelled.
///
/// ### Content Errors
/// - [`ErrorKind::Decode`]
/// - [`ErrorKind::Unsupported`]
/// - [`ErrorKind::NoTracks`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Opening the remote byte stream failed.
    #[display("could not read remote file")]
    Storage,
    /// The container is corrupt or not what its extension claims.
    #[display("decode failed: {_0}")]
    Decode(#[error(not(source))] String),
    /// The codec does not handle this container type, or nothing in the
    /// container uses a codec it knows.
    #[display("unsupported content: {_0}")]
    Unsupported(#[error(not(source))] String),
    /// The container decoded cleanly but holds no audio tracks.
    #[display("no playable tracks")]
    NoTracks,
    /// A codec for this extension is already registered.
    #[display("extension `{_0}` already has a codec")]
    DuplicateExtension(#[error(not(source))] String),
    /// Per-track metadata could not be produced.
    #[display("track metadata unavailable: {_0}")]
    Metadata(#[error(not(source))] String),
    /// The blocking decode task did not complete.
    #[display("decode task failed")]
    Join,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Join)
    }
}
