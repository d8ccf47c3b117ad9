//! Catalog Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Failures from the storage and codec crates are wrapped
//! as children of [`ErrorKind::Listing`], [`ErrorKind::Decode`] or
//! [`ErrorKind::Backend`].

use cumulus_storage::FileId;
use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, grouped by what the caller should do about it.
///
/// ### Lookup Errors
/// Each is distinct so callers can tell a malformed ID from a stale one.
/// - [`ErrorKind::InvalidId`] - the ID is not of the form `{index}-{file}`.
/// - [`ErrorKind::NotFound`] - no such track in the current catalog.
/// - [`ErrorKind::MissingFile`] - the ID names a file the catalog does not
///   know; refreshing may help.
/// - [`ErrorKind::MissingTrack`] - the file no longer decodes to that many
///   tracks.
///
/// ### Fatal-to-call Errors
/// - [`ErrorKind::Listing`]
/// - [`ErrorKind::Decode`]
///
/// ### Construction Errors
/// - [`ErrorKind::MissingCredential`]
/// - [`ErrorKind::Backend`]
/// - [`ErrorKind::UnknownSource`]
/// - [`ErrorKind::DuplicateSource`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("expected an OAuth credential")]
    MissingCredential,
    #[display("malformed track ID `{_0}`")]
    InvalidId(#[error(not(source))] String),
    #[display("could not find {_0}")]
    NotFound(#[error(not(source))] String),
    #[display("missing file {_0}")]
    MissingFile(#[error(not(source))] FileId),
    #[display("missing track {_0}")]
    MissingTrack(#[error(not(source))] String),
    /// Enumerating the remote account failed; the previous catalog is intact.
    #[display("could not list remote files")]
    Listing,
    /// The file behind a track could not be decoded again.
    #[display("could not decode remote file")]
    Decode,
    /// The remote backend could not be constructed.
    #[display("could not create remote backend")]
    Backend,
    #[display("no source registered as `{_0}`")]
    UnknownSource(#[error(not(source))] String),
    #[display("a source is already registered as `{_0}`")]
    DuplicateSource(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Listing and decode failures are usually transport problems, though an
    /// expired credential looks the same from here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Listing | Self::Decode)
    }
}
