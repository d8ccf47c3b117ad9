//! The cumulus music catalog.
//!
//! Turns the files in a remote account into a catalog of individually
//! addressable tracks. A [`DriveSource`] lists the account, probes every file
//! it has a codec for, and hands out [`Song`](cumulus_codec::Song)s whose
//! bytes are only fetched when the host asks to play them.
//!
//! Tracks are addressed by [`TrackId`], see [`parse_id`].

mod build;
mod catalog;
mod credential;
pub mod error;
pub mod oauth;
mod registry;
mod source;
mod track_id;

pub use crate::build::{BuildEvent, build, build_events};
pub use crate::catalog::{Catalog, FileTable, SkipReason, Skipped, TrackTable};
pub use crate::credential::Token;
pub use crate::oauth::OAuthClient;
#[cfg(feature = "drive")]
pub use crate::registry::register_drive;
pub use crate::registry::{DRIVE, SourceFactory, SourceRegistry};
pub use crate::source::{DriveSource, Source, SourceHandle, SourceState};
pub use crate::track_id::TrackId;
use cumulus_storage::FileId;

/// Split a track ID into its file identifier and track index.
///
/// This is the parser hosts use to route an ID back to the source and file it
/// came from.
pub fn parse_id(id: &str) -> error::Result<(FileId, usize)> {
    TrackId::parse(id)
}
