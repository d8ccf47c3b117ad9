//! In-memory remote backend for testing.

use crate::backend::{BoxSyncRead, RemoteBackend};
use crate::error::{ErrorKind, Result};
use crate::models::{Download, FileId, ListPage, RemoteFile};
use async_trait::async_trait;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

const MOCK_SCHEME: &str = "mock://";

/// In-memory remote backend for testing.
///
/// Files are kept in listing order behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Every call is
/// counted, which lets tests assert on how much "network" traffic an
/// operation caused.
pub struct MockBackend {
    name: String,
    files: RwLock<Vec<(RemoteFile, Vec<u8>)>>,
    page_size: usize,
    fail_listing: AtomicBool,
    lists: AtomicUsize,
    locates: AtomicUsize,
    opens: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files, listed in the given
    /// order.
    pub fn with_files(files: impl IntoIterator<Item = (RemoteFile, Vec<u8>)>) -> Self {
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files.into_iter().collect()),
            page_size: 100,
            fail_listing: AtomicBool::new(false),
            lists: AtomicUsize::new(0),
            locates: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Change how many files are returned per listing page.
    ///
    /// Panics on zero; a test with a zero page size would never terminate.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size > 0, "MockBackend::with_page_size: page size must be non-zero");
        self.page_size = page_size;
        self
    }

    /// Make every subsequent listing request fail (or succeed again).
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Append a file to the end of the listing.
    pub async fn insert(&self, file: RemoteFile, data: impl Into<Vec<u8>>) {
        self.files.write().await.push((file, data.into()));
    }

    /// Remove a file from the listing, returning whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let mut guard = self.files.write().await;
        let before = guard.len();
        guard.retain(|(file, _)| file.id.as_str() != id);
        before != guard.len()
    }

    /// Number of listing pages requested so far.
    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Number of download locations resolved so far.
    pub fn locates(&self) -> usize {
        self.locates.load(Ordering::SeqCst)
    }

    /// Number of byte streams opened so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::with_files(Vec::<(RemoteFile, Vec<u8>)>::new())
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListPage> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Network("mock listing failure".to_string()));
        }
        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ErrorKind::InvalidResponse(format!("bad page token `{token}`")))?,
            None => 0,
        };
        let guard = self.files.read().await;
        let end = (offset + self.page_size).min(guard.len());
        let files = guard.get(offset..end).unwrap_or_default().iter().map(|(file, _)| file.clone()).collect();
        let next_page_token = (end < guard.len()).then(|| end.to_string());
        Ok(ListPage { files, next_page_token })
    }

    async fn locate(&self, id: &FileId) -> Result<Download> {
        self.locates.fetch_add(1, Ordering::SeqCst);
        let guard = self.files.read().await;
        let (file, data) =
            guard.iter().find(|(file, _)| &file.id == id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id.clone())))?;
        Ok(Download {
            id: file.id.clone(),
            url: format!("{MOCK_SCHEME}{}", file.id),
            size: data.len() as u64,
        })
    }

    async fn open(&self, download: &Download) -> Result<BoxSyncRead> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let Some(id) = download.url.strip_prefix(MOCK_SCHEME) else {
            exn::bail!(ErrorKind::Status("404 Not Found".to_string()));
        };
        let guard = self.files.read().await;
        let (_, data) = guard
            .iter()
            .find(|(file, _)| file.id.as_str() == id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::Status("404 Not Found".to_string())))?;
        Ok(Box::new(Cursor::new(data.clone())))
    }
}
