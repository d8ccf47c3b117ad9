use crate::track_id::TrackId;
use cumulus_codec::SongInfo;
use cumulus_storage::{FileId, RemoteFile};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type FileTable = HashMap<FileId, RemoteFile>;
pub type TrackTable = BTreeMap<TrackId, SongInfo>;

/// One complete snapshot of a remote account's playable audio.
///
/// A catalog is built wholesale by a refresh and never modified afterwards;
/// sources publish it behind an [`Arc`](std::sync::Arc) and swap in a new one
/// on the next refresh.
///
/// Catalogs serialize, so a host can persist one alongside the credential and
/// restore it with [`DriveSource::restore`](crate::DriveSource::restore)
/// instead of probing the whole account again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub(crate) files: FileTable,
    pub(crate) tracks: TrackTable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) skipped: Vec<Skipped>,
}
impl Catalog {
    /// Files that decoded successfully, keyed by identifier.
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    pub fn file(&self, id: &str) -> Option<&RemoteFile> {
        self.files.get(id)
    }

    pub fn track(&self, id: &str) -> Option<&SongInfo> {
        self.tracks.get(id)
    }

    /// Everything the build passed over, and why.
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A file (or a single track of a file) left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub file: FileId,
    pub title: String,
    /// Set when only one track was skipped rather than the whole file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackId>,
    pub reason: SkipReason,
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SkipReason {
    /// No codec claims the file's extension. The file was never opened.
    #[display("unrecognized file type")]
    Unrecognized,
    #[display("no playable tracks")]
    NoTracks,
    #[display("{_0}")]
    Decode(String),
    #[display("{_0}")]
    Metadata(String),
}
