use crate::codec::{Codec, CodecHandle};
use crate::error::{ErrorKind, Result};
use crate::models::Decoded;
use cumulus_storage::FileReader;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Maps file extensions to the codec that understands them.
///
/// Lookups are case-insensitive and tolerate a leading dot. Files with an
/// extension nobody claims are not an error: they simply contain no songs, and
/// no bytes are fetched to find that out.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, CodecHandle>,
}
impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every codec compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "symphonia")]
        registry.insert(Arc::new(crate::probe::SymphoniaCodec::new()));
        registry
    }

    /// Register a codec for all of its extensions.
    ///
    /// Fails without registering anything if any extension is already taken.
    pub fn register(&mut self, codec: impl Codec + 'static) -> Result<()> {
        let codec: CodecHandle = Arc::new(codec);
        if let Some(taken) = codec.extensions().iter().map(|e| normalize(e)).find(|e| self.codecs.contains_key(e)) {
            exn::bail!(ErrorKind::DuplicateExtension(taken));
        }
        self.insert(codec);
        Ok(())
    }

    fn insert(&mut self, codec: CodecHandle) {
        for extension in codec.extensions() {
            self.codecs.insert(normalize(extension), Arc::clone(&codec));
        }
    }

    pub fn get(&self, extension: &str) -> Option<&CodecHandle> {
        self.codecs.get(&normalize(extension))
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Every registered extension, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<_> = self.codecs.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Decode `reader` with the codec registered for `extension`.
    ///
    /// Returns an empty [`Decoded`] without touching `reader` when the
    /// extension is missing or unclaimed.
    #[instrument(skip(self, reader), fields(file = %reader.id()))]
    pub async fn by_extension(&self, extension: Option<&str>, reader: &FileReader) -> Result<Decoded> {
        let Some((extension, codec)) = extension.map(normalize).and_then(|e| self.codecs.get(&e).map(|c| (e, c)))
        else {
            return Ok(Decoded::default());
        };
        tracing::trace!(codec = codec.name(), "Decoding");
        codec.decode(reader, &extension).await
    }
}
impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry").field("extensions", &self.extensions()).finish()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCodec;
    use cumulus_storage::backend::MockBackend;
    use cumulus_storage::{BackendHandle, RemoteFile};
    use rstest::rstest;

    fn backend(data: &[u8]) -> Arc<MockBackend> {
        Arc::new(MockBackend::with_files([(RemoteFile::new("f1", "album.txt", data.len() as u64), data.to_vec())]))
    }

    #[rstest]
    #[case("txt", true)]
    #[case("TXT", true)]
    #[case(".txt", true)]
    #[case("mp3", false)]
    #[case("", false)]
    fn test_supports(#[case] extension: &str, #[case] expected: bool) {
        let mut registry = CodecRegistry::new();
        registry.register(MockCodec::new()).unwrap();
        assert_eq!(registry.supports(extension), expected);
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let mut registry = CodecRegistry::new();
        registry.register(MockCodec::new()).unwrap();
        let err = registry.register(MockCodec::with_extensions(&["flac", "TXT"])).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateExtension(e) if e == "txt"));
        // Nothing from the rejected codec was registered.
        assert!(!registry.supports("flac"));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("exe"))]
    #[tokio::test]
    async fn test_unknown_extension_is_empty_without_io(#[case] extension: Option<&str>) {
        let mock = backend(b"One|A\n");
        let handle: BackendHandle = mock.clone();
        let mut registry = CodecRegistry::new();
        registry.register(MockCodec::new()).unwrap();
        let decoded = registry.by_extension(extension, &FileReader::new(handle, "f1")).await.unwrap();
        assert!(decoded.is_empty());
        assert_eq!(mock.locates(), 0);
        assert_eq!(mock.opens(), 0);
    }

    #[tokio::test]
    async fn test_known_extension_is_case_insensitive() {
        let mock = backend(b"One|A\nTwo|B\n");
        let mut registry = CodecRegistry::new();
        registry.register(MockCodec::new()).unwrap();
        let decoded = registry.by_extension(Some("TxT"), &FileReader::new(mock.clone(), "f1")).await.unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(mock.opens(), 1);
    }

    #[cfg(feature = "symphonia")]
    #[test]
    fn test_defaults_cover_common_formats() {
        let registry = CodecRegistry::with_defaults();
        for extension in ["mp3", "flac", "ogg", "m4a", "mka", "oga", "wav"] {
            assert!(registry.supports(extension), "{extension}");
        }
        for video in ["mp4", "webm", "mkv", "mov"] {
            assert!(!registry.supports(video), "{video}");
        }
    }
}
