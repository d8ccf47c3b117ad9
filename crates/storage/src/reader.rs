//! Deferred, fetch-on-demand access to a single remote file.

use crate::BackendHandle;
use crate::backend::BoxSyncRead;
use crate::error::Result;
use crate::models::FileId;
use std::fmt;
use tracing::instrument;

/// A byte stream opened by [`FileReader::open`], with the file's declared
/// total length.
pub struct OpenedFile {
    pub reader: BoxSyncRead,
    pub length: u64,
}
impl fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedFile").field("length", &self.length).finish_non_exhaustive()
    }
}

/// Lazily opens a remote file.
///
/// Constructing a `FileReader` only captures the backend handle and the file
/// identifier; nothing touches the network until [`open`](Self::open) is
/// awaited. Every call to `open` resolves the download location and opens a
/// fresh, independent stream. There is no caching between calls.
///
/// # Examples
///
/// ```no_run
/// use std::io::Read;
/// use cumulus_storage::{BackendHandle, FileReader, error::{ErrorKind, Result}};
///
/// async fn first_bytes(backend: BackendHandle) -> Result<Vec<u8>> {
///     let reader = FileReader::new(backend, "1a2b3c");
///     let opened = reader.open().await?;
///     let head = tokio::task::spawn_blocking(move || {
///         let mut head = Vec::new();
///         opened.reader.take(16).read_to_end(&mut head).map(|_| head)
///     });
///     Ok(head.await.expect("reader task panicked").map_err(ErrorKind::from)?)
/// }
/// ```
#[derive(Clone)]
pub struct FileReader {
    backend: BackendHandle,
    id: FileId,
}
impl FileReader {
    pub fn new(backend: BackendHandle, id: impl Into<FileId>) -> Self {
        Self { backend, id: id.into() }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Resolve the download location and open the byte stream.
    #[instrument(skip(self), fields(backend = self.backend.name(), file = %self.id))]
    pub async fn open(&self) -> Result<OpenedFile> {
        let download = self.backend.locate(&self.id).await?;
        tracing::debug!(size = download.size, "Opening remote file");
        let reader = self.backend.open(&download).await?;
        Ok(OpenedFile { reader, length: download.size })
    }
}
impl fmt::Debug for FileReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileReader").field("backend", &self.backend.name()).field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::ErrorKind;
    use crate::models::RemoteFile;
    use std::io::Read;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_construction_performs_no_io() {
        let mock = Arc::new(MockBackend::with_files([(RemoteFile::new("a", "a.mp3", 3), b"abc".to_vec())]));
        let backend: BackendHandle = mock.clone();
        let _reader = FileReader::new(backend, "a");
        assert_eq!(mock.locates(), 0);
        assert_eq!(mock.opens(), 0);
    }

    #[tokio::test]
    async fn test_each_open_is_independent() {
        let mock = Arc::new(MockBackend::with_files([(RemoteFile::new("a", "a.mp3", 3), b"abc".to_vec())]));
        let reader = FileReader::new(mock.clone(), "a");
        for _ in 0..2 {
            let mut opened = reader.open().await.unwrap();
            assert_eq!(opened.length, 3);
            let mut buf = Vec::new();
            opened.reader.read_to_end(&mut buf).unwrap();
            assert_eq!(buf, b"abc");
        }
        assert_eq!(mock.locates(), 2);
        assert_eq!(mock.opens(), 2);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let mock = Arc::new(MockBackend::default());
        let err = FileReader::new(mock.clone(), "nope").open().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(id) if id.as_str() == "nope"));
        assert_eq!(mock.opens(), 0);
    }
}
