//! Remote backend trait and implementations.
//!
//! This module defines the `RemoteBackend` trait, the capability a remote
//! storage service must offer: a paginated listing of file metadata, the
//! resolution of a file's download location, and an authenticated byte
//! stream for that location.

#[cfg(feature = "drive")]
mod drive;
#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(feature = "drive")]
pub use self::drive::{DEFAULT_API_BASE, DriveBackend, DriveOptions};
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::{Download, FileId, ListPage, RemoteFile};
use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::Read;
use std::pin::Pin;

pub type RemoteFileStream<'a> = Pin<Box<dyn Stream<Item = Result<RemoteFile>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Unified interface for remote storage services.
///
/// All operations are asynchronous; none of them are retried. Transient
/// failures surface immediately and the caller owns the retry policy.
///
/// # Examples
///
/// ```
/// use futures::TryStreamExt;
/// use cumulus_storage::{backend::RemoteBackend, error::Result};
///
/// async fn total_size(backend: &dyn RemoteBackend) -> Result<u64> {
///     let mut total = 0;
///     let mut files = backend.list_stream();
///     while let Some(file) = files.try_next().await? {
///         total += file.size;
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Fetch a single page of the file listing.
    ///
    /// Pass `None` for the first page, then the previous page's
    /// [`next_page_token`](ListPage::next_page_token) until it comes back
    /// empty. Only file metadata is requested, never file contents.
    async fn list_page(&self, page_token: Option<&str>) -> Result<ListPage>;

    /// Stream every file in the account, page by page.
    ///
    /// The next page is only requested once the current one has been fully
    /// consumed. A failing page request is yielded as an error and ends the
    /// stream. An empty page token is treated the same as no token.
    fn list_stream(&self) -> RemoteFileStream<'_> {
        Box::pin(stream! {
            let mut page_token: Option<String> = None;
            loop {
                let page = match self.list_page(page_token.as_deref()).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                };
                for file in page.files {
                    yield Ok(file);
                }
                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
        })
    }

    /// Collect the whole listing into a [`Vec`].
    async fn list(&self) -> Result<Vec<RemoteFile>> {
        self.list_stream().try_collect().await
    }

    /// Resolve where (and how large) a file's contents are.
    ///
    /// This is a metadata call; no file contents are transferred.
    async fn locate(&self, id: &FileId) -> Result<Download>;

    /// Open an authenticated byte stream for a resolved download.
    ///
    /// Returns a `'static` boxed [`Read`] suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). Reading it from
    /// within an async context may block the executor.
    async fn open(&self, download: &Download) -> Result<BoxSyncRead>;
}
