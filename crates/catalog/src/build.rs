//! Catalog construction.
//!
//! [`build_events`] walks the remote listing and probes every file, reporting
//! progress as [`BuildEvent`]s; [`build`] folds those events into a
//! [`Catalog`]. Only a failure to list is fatal: anything that goes wrong with
//! a single file or track becomes a [`Skipped`] entry and the build moves on.

use crate::catalog::{Catalog, SkipReason, Skipped};
use crate::error::{ErrorKind, Result};
use crate::track_id::TrackId;
use async_stream::stream;
use cumulus_codec::error::ErrorKind as CodecErrorKind;
use cumulus_codec::{CodecRegistry, SongInfo};
use cumulus_storage::{BackendHandle, FileReader, RemoteFile};
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use tracing::instrument;

/// Progress events emitted by [`build_events`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete): exactly once, with the
///    number of files listed.
/// 3. [`Probed`](Self::Probed) and [`Skipped`](Self::Skipped): in listing
///    order. A file with some unreadable tracks produces a `Skipped` per bad
///    track, followed by its `Probed`.
/// 4. [`Complete`](Self::Complete): exactly once.
///
/// A listing failure terminates the stream with an error before
/// `DiscoveryComplete`; nothing after that point is fatal.
#[derive(Debug)]
pub enum BuildEvent {
    Started,
    DiscoveryComplete(u64),
    /// A file decoded; these are its readable tracks in container order.
    Probed { file: RemoteFile, tracks: Vec<(TrackId, SongInfo)> },
    Skipped(Skipped),
    Complete,
}

/// Streams [`BuildEvent`]s for every file in `backend`.
///
/// The whole listing is fetched before the first file is probed, so a listing
/// failure is reported before any file's bytes are requested. Files are then
/// probed one at a time.
pub fn build_events<'a>(
    backend: &'a BackendHandle,
    codecs: &'a CodecRegistry,
) -> impl Stream<Item = Result<BuildEvent>> + Send + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(BuildEvent::Started);

        let files = match backend.list().await.or_raise(|| ErrorKind::Listing) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(backend = backend.name(), "Listing remote files failed");
                yield Err(e);
                return;
            },
        };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(BuildEvent::DiscoveryComplete(u64::try_from(files.len()).unwrap_or(0)));

        for file in files {
            let Some(extension) = file.extension.clone().filter(|e| codecs.supports(e)) else {
                tracing::trace!(file = %file.id, title = %file.title, "Skipping unrecognized file");
                yield Ok(BuildEvent::Skipped(skip(&file, None, SkipReason::Unrecognized)));
                continue;
            };

            let reader = FileReader::new(Arc::clone(backend), file.id.clone());
            let decoded = match codecs.by_extension(Some(&extension), &reader).await {
                Ok(decoded) if decoded.is_empty() => Err(SkipReason::NoTracks),
                Ok(decoded) => Ok(decoded),
                Err(e) if matches!(&*e, CodecErrorKind::NoTracks) => Err(SkipReason::NoTracks),
                Err(e) => Err(SkipReason::Decode(e.to_string())),
            };
            let decoded = match decoded {
                Ok(decoded) => decoded,
                Err(reason) => {
                    tracing::debug!(file = %file.id, title = %file.title, %reason, "Skipping file");
                    yield Ok(BuildEvent::Skipped(skip(&file, None, reason)));
                    continue;
                },
            };

            let mut tracks = Vec::with_capacity(decoded.len());
            for (index, song) in decoded.songs.iter().enumerate() {
                let id = TrackId::new(index, &file.id);
                match song.info() {
                    Ok(info) => tracks.push((id, info.with_title_fallback(file.display_name()))),
                    Err(e) => {
                        let reason = SkipReason::Metadata(e.to_string());
                        tracing::debug!(track = %id, %reason, "Skipping track");
                        yield Ok(BuildEvent::Skipped(skip(&file, Some(id), reason)));
                    },
                }
            }
            yield Ok(BuildEvent::Probed { file, tracks });
        }

        yield Ok(BuildEvent::Complete);
    })
}

/// Build a fresh [`Catalog`] from everything in `backend`.
///
/// Deterministic for a given listing and deterministic codecs: an unchanged
/// account yields the same track IDs and metadata every time.
#[instrument(skip_all, fields(backend = backend.name()))]
pub async fn build(backend: &BackendHandle, codecs: &CodecRegistry) -> Result<Catalog> {
    let mut catalog = Catalog::default();
    let mut listed = 0;
    let mut events = pin!(build_events(backend, codecs));
    while let Some(event) = events.next().await {
        match event? {
            BuildEvent::Started | BuildEvent::Complete => {},
            BuildEvent::DiscoveryComplete(count) => listed = count,
            BuildEvent::Probed { file, tracks } => {
                catalog.tracks.extend(tracks);
                catalog.files.insert(file.id.clone(), file);
            },
            BuildEvent::Skipped(skipped) => catalog.skipped.push(skipped),
        }
    }
    tracing::info!(
        listed,
        files = catalog.files.len(),
        tracks = catalog.tracks.len(),
        skipped = catalog.skipped.len(),
        "Catalog built"
    );
    Ok(catalog)
}

fn skip(file: &RemoteFile, track: Option<TrackId>, reason: SkipReason) -> Skipped {
    Skipped { file: file.id.clone(), title: file.title.clone(), track, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_codec::mock::MockCodec;
    use cumulus_storage::backend::MockBackend;
    use futures::TryStreamExt;

    fn codecs() -> CodecRegistry {
        let mut codecs = CodecRegistry::new();
        codecs.register(MockCodec::new()).unwrap();
        codecs
    }

    fn file(id: &str, title: &str, data: &str) -> (RemoteFile, Vec<u8>) {
        (RemoteFile::new(id, title, data.len() as u64), data.as_bytes().to_vec())
    }

    fn backend(files: Vec<(RemoteFile, Vec<u8>)>) -> (Arc<MockBackend>, BackendHandle) {
        let mock = Arc::new(MockBackend::with_files(files).with_page_size(2));
        let handle: BackendHandle = mock.clone();
        (mock, handle)
    }

    #[tokio::test]
    async fn test_counts() {
        // 5 files listed, 3 decodable, 4 tracks in total.
        let (_, handle) = backend(vec![
            file("a", "a.txt", "One|X\nTwo|X\n"),
            file("b", "b.txt", "corrupt\n"),
            file("c", "c.txt", "Three|Y\n"),
            file("d", "cover.jpg", "\u{1}\u{2}"),
            file("e", "e.txt", "Four|Z\n"),
        ]);
        let catalog = build(&handle, &codecs()).await.unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.files().len(), 3);
        for id in catalog.tracks().keys() {
            let (file, _) = TrackId::parse(id.as_str()).unwrap();
            assert!(catalog.files().contains_key(&file));
        }
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let (_, handle) = backend(vec![file("A", "a.txt", "One|X\nTwo|X\n"), file("B", "b.txt", "corrupt\n")]);
        let catalog = build(&handle, &codecs()).await.unwrap();
        let ids: Vec<_> = catalog.tracks().keys().map(TrackId::as_str).collect();
        assert_eq!(ids, ["0-A", "1-A"]);
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.skipped()[0].file.as_str(), "B");
        assert!(matches!(catalog.skipped()[0].reason, SkipReason::Decode(_)));
    }

    #[tokio::test]
    async fn test_bad_track_skips_only_that_track() {
        let (_, handle) = backend(vec![file("A", "a.txt", "One|X\n!bad\nThree|X\n")]);
        let catalog = build(&handle, &codecs()).await.unwrap();
        let ids: Vec<_> = catalog.tracks().keys().map(TrackId::as_str).collect();
        assert_eq!(ids, ["0-A", "2-A"]);
        assert!(catalog.file("A").is_some());
        let skipped = &catalog.skipped()[0];
        assert_eq!(skipped.track.as_ref().map(TrackId::as_str), Some("1-A"));
        assert!(matches!(skipped.reason, SkipReason::Metadata(_)));
    }

    #[tokio::test]
    async fn test_empty_container_is_skipped() {
        let (_, handle) = backend(vec![file("A", "a.txt", "\n\n")]);
        let catalog = build(&handle, &codecs()).await.unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.files().is_empty());
        assert_eq!(catalog.skipped()[0].reason, SkipReason::NoTracks);
    }

    #[tokio::test]
    async fn test_unrecognized_files_are_never_opened() {
        let (mock, handle) =
            backend(vec![file("d", "doc", "Not|Audio\n"), file("e", "cover.jpg", "x"), file("f", "notes.TXT", "A|B\n")]);
        let catalog = build(&handle, &codecs()).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(mock.opens(), 1);
        let unrecognized = catalog.skipped().iter().filter(|s| s.reason == SkipReason::Unrecognized).count();
        assert_eq!(unrecognized, 2);
    }

    #[tokio::test]
    async fn test_missing_title_falls_back_to_file_name() {
        let (_, handle) = backend(vec![file("A", "Live at Home.txt", "|Band\nNamed|Band\n")]);
        let catalog = build(&handle, &codecs()).await.unwrap();
        assert_eq!(catalog.track("0-A").unwrap().title.as_deref(), Some("Live at Home"));
        assert_eq!(catalog.track("1-A").unwrap().title.as_deref(), Some("Named"));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let (_, handle) = backend(vec![
            file("A", "a.txt", "One|X\nTwo|X\n"),
            file("B", "b.txt", "Three|Y\n"),
            file("C", "c.txt", "corrupt\n"),
        ]);
        let first = build(&handle, &codecs()).await.unwrap();
        let second = build(&handle, &codecs()).await.unwrap();
        assert_eq!(first.tracks(), second.tracks());
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let (mock, handle) = backend(vec![file("A", "a.txt", "One|X\n")]);
        mock.fail_listing(true);
        let err = build(&handle, &codecs()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Listing));
        assert_eq!(mock.opens(), 0);
    }

    #[tokio::test]
    async fn test_event_order() {
        let (_, handle) = backend(vec![file("A", "a.txt", "One|X\n"), file("B", "b.bin", "")]);
        let codecs = codecs();
        let events: Vec<_> = build_events(&handle, &codecs).try_collect().await.unwrap();
        assert!(matches!(events[0], BuildEvent::Started));
        assert!(matches!(events[1], BuildEvent::DiscoveryComplete(2)));
        assert!(matches!(&events[2], BuildEvent::Probed { file, tracks } if file.id.as_str() == "A" && tracks.len() == 1));
        assert!(matches!(&events[3], BuildEvent::Skipped(s) if s.reason == SkipReason::Unrecognized));
        assert!(matches!(events[4], BuildEvent::Complete));
        assert_eq!(events.len(), 5);
    }
}
