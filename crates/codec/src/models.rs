use crate::Song;
use cumulus_storage::OpenedFile;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata for a single playable track.
///
/// Everything is optional because tags are optional: a container may carry
/// nothing but audio. The catalog fills a missing title from the remote file
/// name so every entry it serves is displayable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Track number as tagged, not the position within the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}
impl SongInfo {
    /// Use `fallback` as the title when none was tagged (or it is blank).
    pub fn with_title_fallback(mut self, fallback: impl Into<String>) -> Self {
        if self.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            self.title = Some(fallback.into());
        }
        self
    }
}

/// A freshly opened byte stream for one track, ready to hand to a player.
///
/// `track` identifies the track within the container for formats that hold
/// more than one; `None` means "the default track".
#[derive(Debug)]
pub struct TrackStream {
    pub file: OpenedFile,
    pub track: Option<u32>,
}

/// Everything a codec found in one container, in container order.
#[derive(Debug, Default)]
pub struct Decoded {
    pub songs: Vec<Box<dyn Song>>,
    /// Short container/format name, when the codec can tell.
    pub container: Option<String>,
}
impl Decoded {
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
