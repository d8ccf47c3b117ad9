pub mod backend;
pub mod error;
mod models;
mod reader;

pub use crate::backend::RemoteBackend;
pub use crate::models::{Download, FileId, ListPage, RemoteFile};
pub use crate::reader::{FileReader, OpenedFile};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn RemoteBackend + Send + Sync>;
