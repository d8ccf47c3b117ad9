//! Container probing with `symphonia`.
//!
//! Only the container header is read: tags come from the probe and container
//! metadata logs, durations from codec parameters. No audio is decoded.

use crate::codec::Codec;
use crate::error::{ErrorKind, Result};
use crate::models::{Decoded, SongInfo, TrackStream};
use crate::song::Song;
use async_trait::async_trait;
use cumulus_storage::{FileReader, OpenedFile};
use exn::ResultExt;
use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey, Value};
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use tracing::instrument;

/// Audio-only containers. Video containers (`mp4`, `webm`, `mkv`) are never
/// claimed, even though they may carry audio.
const EXTENSIONS: &[&str] = &["aac", "flac", "m4a", "mka", "mp3", "oga", "ogg", "wav"];

/// Name of the container format behind a claimed extension.
fn container_name(extension: &str) -> Option<&'static str> {
    Some(match extension {
        "aac" => "adts",
        "flac" => "flac",
        "m4a" => "isomp4",
        "mka" => "mkv",
        "mp3" => "mp3",
        "oga" | "ogg" => "ogg",
        "wav" => "wav",
        _ => return None,
    })
}

#[derive(Debug, Default)]
pub struct SymphoniaCodec;
impl SymphoniaCodec {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Codec for SymphoniaCodec {
    fn name(&self) -> &str {
        "symphonia"
    }

    fn extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    #[instrument(skip(self, reader), fields(file = %reader.id()))]
    async fn decode(&self, reader: &FileReader, extension: &str) -> Result<Decoded> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        let Some(container) = container_name(&extension) else {
            exn::bail!(ErrorKind::Unsupported(format!("`{extension}` is not an audio container")));
        };
        let opened = reader.open().await.or_raise(|| ErrorKind::Storage)?;
        let probed = tokio::task::spawn_blocking(move || probe(opened, &extension))
            .await
            .or_raise(|| ErrorKind::Join)??;

        tracing::debug!(tracks = probed.tracks.len(), "Probed container");
        let songs = probed
            .tracks
            .into_iter()
            .map(|(track, info)| Box::new(SymphoniaSong { reader: reader.clone(), track, info }) as Box<dyn Song>)
            .collect();
        Ok(Decoded { songs, container: Some(container.to_string()) })
    }
}

#[derive(Debug)]
struct SymphoniaSong {
    reader: FileReader,
    track: u32,
    info: SongInfo,
}

#[async_trait]
impl Song for SymphoniaSong {
    fn info(&self) -> Result<SongInfo> {
        Ok(self.info.clone())
    }

    async fn open(&self) -> Result<TrackStream> {
        let file = self.reader.open().await.or_raise(|| ErrorKind::Storage)?;
        Ok(TrackStream { file, track: Some(self.track) })
    }
}

struct Probed {
    tracks: Vec<(u32, SongInfo)>,
}

/// `symphonia` wants a `Sync` source; remote streams are only `Send`.
struct Exclusive<R>(Mutex<R>);
impl<R: Read> Read for Exclusive<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.get_mut().unwrap_or_else(PoisonError::into_inner).read(buf)
    }
}

fn probe(opened: OpenedFile, extension: &str) -> Result<Probed> {
    let source = ReadOnlySource::new(Exclusive(Mutex::new(opened.reader)));
    let mss = MediaSourceStream::new(Box::new(source), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(extension);

    let mut probed = get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .or_raise(|| ErrorKind::Decode(format!("unrecognised {extension} container")))?;

    // Tags found before the container (e.g. ID3v2), then those inside it.
    let mut tags = SongInfo::default();
    if let Some(mut log) = probed.metadata.get()
        && let Some(revision) = log.skip_to_latest()
    {
        apply_revision(revision, &mut tags);
    }
    {
        let mut log = probed.format.metadata();
        if let Some(revision) = log.skip_to_latest() {
            apply_revision(revision, &mut tags);
        }
    }

    let all = probed.format.tracks();
    if all.is_empty() {
        exn::bail!(ErrorKind::NoTracks);
    }
    let tracks: Vec<_> = all
        .iter()
        .filter(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .map(|track| {
            let params = &track.codec_params;
            let duration = params.time_base.zip(params.n_frames).map(|(base, frames)| {
                let time = base.calc_time(frames);
                Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac)
            });
            (track.id, SongInfo { duration, ..tags.clone() })
        })
        .collect();
    if tracks.is_empty() {
        exn::bail!(ErrorKind::Unsupported(format!("no track in the {extension} container has a known codec")));
    }
    Ok(Probed { tracks })
}

fn apply_revision(revision: &MetadataRevision, out: &mut SongInfo) {
    for tag in revision.tags() {
        let Some(value) = value_to_string(&tag.value) else {
            continue;
        };
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => out.title = Some(value),
            Some(StandardTagKey::Artist) => out.artist = Some(value),
            Some(StandardTagKey::Album) => out.album = Some(value),
            Some(StandardTagKey::TrackNumber) => out.track = parse_track_number(&value).or(out.track),
            _ => {},
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    let value = match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

/// Accepts `"3"` as well as the `"3/12"` form.
fn parse_track_number(value: &str) -> Option<u32> {
    value.split('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_storage::RemoteFile;
    use cumulus_storage::backend::MockBackend;
    use rstest::rstest;
    use std::sync::Arc;

    #[rstest]
    #[case("3", Some(3))]
    #[case(" 7/12", Some(7))]
    #[case("A1", None)]
    #[case("", None)]
    fn test_parse_track_number(#[case] value: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_track_number(value), expected);
    }

    #[rstest]
    #[case(Value::String("  Song ".into()), Some("Song"))]
    #[case(Value::String("   ".into()), None)]
    #[case(Value::UnsignedInt(4), Some("4"))]
    fn test_value_to_string(#[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(value_to_string(&value).as_deref(), expected);
    }

    /// A minimal PCM WAV: 8 kHz, mono, 16-bit, one second of silence.
    fn wav() -> Vec<u8> {
        let rate: u32 = 8000;
        let data_len: u32 = rate * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    fn reader(name: &str, data: Vec<u8>) -> FileReader {
        let file = RemoteFile::new("f1", name, data.len() as u64);
        FileReader::new(Arc::new(MockBackend::with_files([(file, data)])), "f1")
    }

    #[tokio::test]
    async fn test_decode_wav() {
        let decoded = SymphoniaCodec::new().decode(&reader("tone.wav", wav()), "wav").await.unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.container.as_deref(), Some("wav"));
        let info = decoded.songs[0].info().unwrap();
        assert_eq!(info.duration, Some(Duration::from_secs(1)));
        assert_eq!(info.title, None);
    }

    #[tokio::test]
    async fn test_decode_uppercase_extension() {
        let decoded = SymphoniaCodec::new().decode(&reader("TONE.WAV", wav()), ".WAV").await.unwrap();
        assert_eq!(decoded.container.as_deref(), Some("wav"));
    }

    #[rstest]
    #[case("mp4")]
    #[case("webm")]
    #[case("txt")]
    #[tokio::test]
    async fn test_unclaimed_extension_is_never_opened(#[case] extension: &str) {
        let mock = Arc::new(MockBackend::with_files([(RemoteFile::new("f1", "clip", 3), b"abc".to_vec())]));
        let reader = FileReader::new(mock.clone(), "f1");
        let err = SymphoniaCodec::new().decode(&reader, extension).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unsupported(_)));
        assert_eq!(mock.opens(), 0);
    }

    #[test]
    fn test_every_extension_names_a_container() {
        for extension in EXTENSIONS {
            assert!(container_name(extension).is_some(), "{extension}");
        }
    }

    #[tokio::test]
    async fn test_decode_garbage() {
        let err = SymphoniaCodec::new()
            .decode(&reader("noise.mp3", b"definitely not audio".to_vec()), "mp3")
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
    }
}
