//! Storage models.
//!
//! These types describe remote files as reported by a listing, without ever
//! touching their contents.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::path::Path;

/// Opaque, stable identifier of a file within one remote account.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);
impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl Borrow<str> for FileId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// File metadata returned by a listing.
///
/// Only the fields needed to decide whether (and how) to probe a file are
/// kept; the listing never requests file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Identifier used for every later request about this file
    pub id: FileId,
    /// File extension hint (without the leading dot), if the service knows one
    pub extension: Option<String>,
    /// Declared file size in bytes
    pub size: u64,
    /// Human readable file name
    pub title: String,
}
impl RemoteFile {
    pub fn new(id: impl Into<FileId>, title: impl Into<String>, size: u64) -> Self {
        let title = title.into();
        let extension = Path::new(&title).extension().and_then(|e| e.to_str()).map(str::to_string);
        Self {
            id: id.into(),
            extension,
            size,
            title,
        }
    }

    /// Override the extension hint derived from the title.
    pub fn with_extension(mut self, extension: Option<impl Into<String>>) -> Self {
        self.extension = extension.map(Into::into);
        self
    }

    /// Title with the extension hint removed, suitable as a fallback display
    /// name for tracks that carry no tags.
    pub fn display_name(&self) -> &str {
        match &self.extension {
            Some(ext) => self
                .title
                .len()
                .checked_sub(ext.len() + 1)
                .filter(|&stem| stem > 0)
                .and_then(|stem| {
                    let (name, suffix) = self.title.split_at_checked(stem)?;
                    let suffix = suffix.strip_prefix('.')?;
                    suffix.eq_ignore_ascii_case(ext).then_some(name)
                })
                .unwrap_or(&self.title),
            None => &self.title,
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub files: Vec<RemoteFile>,
    /// Opaque token for the next page; `None` when this was the last page.
    pub next_page_token: Option<String>,
}

/// Resolved, authenticated download location of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub id: FileId,
    pub url: String,
    /// Declared total length of the byte stream
    pub size: u64,
}
