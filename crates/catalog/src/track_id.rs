//! Track addressing.
//!
//! A track is addressed as `"{index}-{file}"`: its position within the
//! decoded container, then the remote file identifier. The index comes first
//! because it never contains the separator, while file identifiers may.

use crate::error::{Error, ErrorKind, Result};
use cumulus_storage::FileId;
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const SEPARATOR: char = '-';

/// Opaque, stable identifier for one track of one remote file.
///
/// Identical inputs always produce identical IDs, so an unchanged remote file
/// keeps its track IDs across refreshes. Equality, hashing and ordering are
/// those of the string form, which lets maps keyed by `TrackId` be queried
/// with a plain `&str`.
#[derive(Debug, Display, Clone)]
#[display("{raw}")]
pub struct TrackId {
    raw: String,
    index: usize,
    /// Byte offset where the file identifier starts.
    file_start: usize,
}
impl TrackId {
    pub fn new(index: usize, file: &FileId) -> Self {
        let prefix = format!("{index}{SEPARATOR}");
        Self { file_start: prefix.len(), raw: prefix + file.as_str(), index }
    }

    /// Split a track ID back into its file identifier and track index.
    ///
    /// The index must be a canonical decimal integer (no sign, no leading
    /// zeros) so that every valid ID has exactly one spelling.
    pub fn parse(id: &str) -> Result<(FileId, usize)> {
        let parsed: Self = id.parse()?;
        Ok((parsed.file_id(), parsed.index))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file_id(&self) -> FileId {
        FileId::new(&self.raw[self.file_start..])
    }
}
impl FromStr for TrackId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let invalid = || ErrorKind::InvalidId(id.to_string());
        let (index, file) = id.split_once(SEPARATOR).ok_or_raise(invalid)?;
        let canonical = !index.is_empty()
            && index.bytes().all(|b| b.is_ascii_digit())
            && (index == "0" || !index.starts_with('0'));
        if !canonical || file.is_empty() {
            exn::bail!(invalid());
        }
        Ok(Self {
            raw: id.to_string(),
            index: index.parse::<usize>().or_raise(invalid)?,
            file_start: index.len() + SEPARATOR.len_utf8(),
        })
    }
}
impl PartialEq for TrackId {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for TrackId {}
impl Hash for TrackId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
impl PartialOrd for TrackId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TrackId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}
impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
impl Borrow<str> for TrackId {
    fn borrow(&self) -> &str {
        &self.raw
    }
}
impl Serialize for TrackId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|err: Error| serde::de::Error::custom(&*err))
    }
}
