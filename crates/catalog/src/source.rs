//! Music sources backed by a remote account.

use crate::build::build;
use crate::catalog::Catalog;
use crate::credential::Token;
use crate::error::{ErrorKind, Result};
use crate::track_id::TrackId;
use async_trait::async_trait;
use cumulus_codec::{CodecRegistry, Song, SongInfo};
use cumulus_storage::{BackendHandle, FileReader};
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// What a host can ask of a music source.
#[async_trait]
pub trait Source: fmt::Debug + Send + Sync {
    /// Key distinguishing this source's account from others of the same type.
    fn key(&self) -> &str;

    /// The current catalog, building it first if it has never been built.
    async fn list(&self) -> Result<Arc<Catalog>>;

    /// Metadata for one track from the current catalog. Never touches the
    /// network.
    async fn info(&self, id: &str) -> Result<SongInfo>;

    /// Decode the file behind `id` afresh and return the requested track.
    async fn get_song(&self, id: &str) -> Result<Box<dyn Song>>;

    /// Rebuild the catalog from a fresh listing.
    async fn refresh(&self) -> Result<Arc<Catalog>>;

    /// The published catalog, if one has been built or seeded. Never builds.
    async fn catalog(&self) -> Option<Arc<Catalog>>;

    /// Publish a previously saved catalog in place of the first build.
    ///
    /// Returns `false`, leaving the source untouched, if a catalog is already
    /// published.
    async fn seed(&self, catalog: Catalog) -> bool;
}

pub type SourceHandle = Box<dyn Source>;

/// Everything needed to bring a [`DriveSource`] back after a restart without
/// listing and probing the account again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceState {
    pub token: Token,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Catalog>,
}

/// A Google Drive account (or any other [`RemoteBackend`](cumulus_storage::RemoteBackend))
/// presented as a music source.
///
/// The catalog starts out unbuilt. Readers share the published snapshot
/// through an [`Arc`]; refreshes are serialized so two callers never build at
/// once, and a refresh that fails leaves the previous snapshot in place.
pub struct DriveSource {
    token: Token,
    backend: BackendHandle,
    codecs: CodecRegistry,
    catalog: RwLock<Option<Arc<Catalog>>>,
    refreshing: Mutex<()>,
}

impl DriveSource {
    /// Create a source over an existing backend.
    ///
    /// The backend is expected to be authenticated with `token`. Fails if no
    /// credential was supplied.
    pub fn new(token: Option<Token>, backend: BackendHandle, codecs: CodecRegistry) -> Result<Self> {
        let token = token.ok_or_raise(|| ErrorKind::MissingCredential)?;
        Ok(Self::restore(SourceState { token, catalog: None }, backend, codecs))
    }

    /// Bring back a source from saved state. A saved catalog is published
    /// as-is; the account is not listed until the next refresh.
    pub fn restore(state: SourceState, backend: BackendHandle, codecs: CodecRegistry) -> Self {
        Self {
            token: state.token,
            backend,
            codecs,
            catalog: RwLock::new(state.catalog.map(Arc::new)),
            refreshing: Mutex::new(()),
        }
    }

    /// Create a source talking to the Drive API with `token`.
    #[cfg(feature = "drive")]
    pub fn connect(
        token: Option<Token>,
        options: cumulus_storage::backend::DriveOptions,
        codecs: CodecRegistry,
    ) -> Result<Self> {
        use cumulus_storage::backend::DriveBackend;

        let token = token.ok_or_raise(|| ErrorKind::MissingCredential)?;
        let backend = DriveBackend::new(crate::registry::DRIVE, &token.access_token, options)
            .or_raise(|| ErrorKind::Backend)?;
        Self::new(Some(token), Arc::new(backend), codecs)
    }

    /// [`restore`](Self::restore) a source talking to the Drive API.
    #[cfg(feature = "drive")]
    pub fn reconnect(
        state: SourceState,
        options: cumulus_storage::backend::DriveOptions,
        codecs: CodecRegistry,
    ) -> Result<Self> {
        use cumulus_storage::backend::DriveBackend;

        let backend = DriveBackend::new(crate::registry::DRIVE, &state.token.access_token, options)
            .or_raise(|| ErrorKind::Backend)?;
        Ok(Self::restore(state, Arc::new(backend), codecs))
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Current credential and catalog, for saving.
    pub async fn state(&self) -> SourceState {
        SourceState {
            token: self.token.clone(),
            catalog: self.published().await.map(|catalog| Catalog::clone(&catalog)),
        }
    }

    async fn published(&self) -> Option<Arc<Catalog>> {
        self.catalog.read().await.clone()
    }

    async fn current_or_bootstrap(&self) -> Result<Arc<Catalog>> {
        if let Some(catalog) = self.published().await {
            return Ok(catalog);
        }
        let _guard = self.refreshing.lock().await;
        // Another caller may have finished bootstrapping while we waited.
        if let Some(catalog) = self.published().await {
            return Ok(catalog);
        }
        tracing::debug!(backend = self.backend.name(), "Catalog never built, bootstrapping");
        self.rebuild().await
    }

    /// Callers must hold `refreshing`.
    async fn rebuild(&self) -> Result<Arc<Catalog>> {
        let catalog = Arc::new(build(&self.backend, &self.codecs).await?);
        *self.catalog.write().await = Some(Arc::clone(&catalog));
        Ok(catalog)
    }
}

#[async_trait]
impl Source for DriveSource {
    fn key(&self) -> &str {
        self.token.key()
    }

    async fn list(&self) -> Result<Arc<Catalog>> {
        self.current_or_bootstrap().await
    }

    async fn info(&self, id: &str) -> Result<SongInfo> {
        self.catalog
            .read()
            .await
            .as_ref()
            .and_then(|catalog| catalog.track(id).cloned())
            .ok_or_raise(|| ErrorKind::NotFound(id.to_string()))
    }

    #[instrument(skip(self), fields(backend = self.backend.name()))]
    async fn get_song(&self, id: &str) -> Result<Box<dyn Song>> {
        let track: TrackId = id.parse()?;
        let catalog = self.current_or_bootstrap().await?;
        let file_id = track.file_id();
        let file = catalog.file(file_id.as_str()).ok_or_raise(|| ErrorKind::MissingFile(file_id.clone()))?;

        let reader = FileReader::new(Arc::clone(&self.backend), file.id.clone());
        let decoded = self
            .codecs
            .by_extension(file.extension.as_deref(), &reader)
            .await
            .or_raise(|| ErrorKind::Decode)?;
        tracing::debug!(tracks = decoded.len(), "Re-decoded file");
        decoded.songs.into_iter().nth(track.index()).ok_or_raise(|| ErrorKind::MissingTrack(id.to_string()))
    }

    async fn refresh(&self) -> Result<Arc<Catalog>> {
        let _guard = self.refreshing.lock().await;
        self.rebuild().await
    }

    async fn catalog(&self) -> Option<Arc<Catalog>> {
        self.published().await
    }

    async fn seed(&self, catalog: Catalog) -> bool {
        let _guard = self.refreshing.lock().await;
        let mut published = self.catalog.write().await;
        if published.is_some() {
            return false;
        }
        tracing::debug!(backend = self.backend.name(), tracks = catalog.len(), "Seeded saved catalog");
        *published = Some(Arc::new(catalog));
        true
    }
}

impl fmt::Debug for DriveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveSource")
            .field("backend", &self.backend.name())
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
