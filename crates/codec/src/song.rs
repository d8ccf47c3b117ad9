use crate::error::Result;
use crate::models::{SongInfo, TrackStream};
use async_trait::async_trait;
use std::fmt::Debug;

/// One decoded, individually addressable track.
///
/// A `Song` holds no file bytes. It remembers where it came from so that
/// [`open`](Self::open) can fetch a fresh stream when the host actually wants
/// to play it.
#[async_trait]
pub trait Song: Debug + Send + Sync {
    /// Metadata for this track. May fail for a single track of an otherwise
    /// healthy container.
    fn info(&self) -> Result<SongInfo>;

    /// Open a fresh byte stream positioned at the start of the container.
    async fn open(&self) -> Result<TrackStream>;
}
