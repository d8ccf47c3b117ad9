//! Saved catalogs, so repeated runs do not probe the whole account again.

use crate::error::{ErrorKind, Result};
use cumulus_catalog::{Catalog, Source};
use exn::ResultExt;
use std::io;
use std::path::Path;

/// Seed `source` with the catalog saved at `path`, returning what was
/// loaded. A missing file is not an error.
pub async fn load(source: &dyn Source, path: &Path) -> Result<Option<Catalog>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).or_raise(|| ErrorKind::Catalog(path.to_path_buf())),
    };
    let catalog: Catalog = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Catalog(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), tracks = catalog.len(), "Loaded saved catalog");
    source.seed(catalog.clone()).await;
    Ok(Some(catalog))
}

pub async fn save(path: &Path, catalog: &Catalog) -> Result<()> {
    let json = serde_json::to_vec(catalog).or_raise(|| ErrorKind::Output)?;
    tokio::fs::write(path, json).await.or_raise(|| ErrorKind::Catalog(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), "Saved catalog");
    Ok(())
}
