//! Plain-text codec for testing.
//!
//! A "container" is UTF-8 text with one track per non-empty line, written as
//! `title|artist`. Either half may be empty. A line reading `!bad` produces a
//! track whose metadata cannot be read, and a file whose first line is
//! `corrupt` fails to decode entirely.

use crate::codec::Codec;
use crate::error::{ErrorKind, Result};
use crate::models::{Decoded, SongInfo, TrackStream};
use crate::song::Song;
use async_trait::async_trait;
use cumulus_storage::FileReader;
use exn::ResultExt;
use std::io::Read;

const BAD_TRACK: &str = "!bad";
const CORRUPT: &str = "corrupt";

#[derive(Debug, Clone)]
pub struct MockCodec {
    extensions: &'static [&'static str],
}
impl MockCodec {
    /// A codec claiming the `txt` extension.
    pub fn new() -> Self {
        Self::with_extensions(&["txt"])
    }

    pub fn with_extensions(extensions: &'static [&'static str]) -> Self {
        Self { extensions }
    }
}
impl Default for MockCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Codec for MockCodec {
    fn name(&self) -> &str {
        "mock"
    }

    fn extensions(&self) -> &[&'static str] {
        self.extensions
    }

    async fn decode(&self, reader: &FileReader, _extension: &str) -> Result<Decoded> {
        let opened = reader.open().await.or_raise(|| ErrorKind::Storage)?;
        let text = tokio::task::spawn_blocking(move || {
            let mut text = String::new();
            opened.reader.take(opened.length).read_to_string(&mut text).map(|_| text)
        })
        .await
        .or_raise(|| ErrorKind::Join)?
        .or_raise(|| ErrorKind::Decode("not UTF-8 text".to_string()))?;

        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.first() == Some(&CORRUPT) {
            exn::bail!(ErrorKind::Decode("corrupt mock container".to_string()));
        }
        let songs = lines
            .into_iter()
            .zip(0u32..)
            .map(|(line, index)| {
                Box::new(MockSong { reader: reader.clone(), index, line: line.to_string() }) as Box<dyn Song>
            })
            .collect();
        Ok(Decoded { songs, container: Some("text".to_string()) })
    }
}

#[derive(Debug)]
pub struct MockSong {
    reader: FileReader,
    index: u32,
    line: String,
}

#[async_trait]
impl Song for MockSong {
    fn info(&self) -> Result<SongInfo> {
        if self.line == BAD_TRACK {
            exn::bail!(ErrorKind::Metadata(format!("track {} is unreadable", self.index)));
        }
        let (title, artist) = self.line.split_once('|').unwrap_or((self.line.as_str(), ""));
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());
        Ok(SongInfo {
            title: non_empty(title),
            artist: non_empty(artist),
            track: Some(self.index + 1),
            ..Default::default()
        })
    }

    async fn open(&self) -> Result<TrackStream> {
        let file = self.reader.open().await.or_raise(|| ErrorKind::Storage)?;
        Ok(TrackStream { file, track: Some(self.index) })
    }
}
