use crate::error::Result;
use crate::models::Decoded;
use async_trait::async_trait;
use cumulus_storage::FileReader;
use std::sync::Arc;

pub type CodecHandle = Arc<dyn Codec + Send + Sync>;

/// Decodes a container into its tracks.
///
/// A codec claims a set of lower-case file extensions and is only ever asked
/// to decode files carrying one of them. Decoding may read as much of the file
/// as the format needs; most formats only need the header.
#[async_trait]
pub trait Codec: Send + Sync {
    fn name(&self) -> &str;

    /// Lower-case extensions, without the leading dot.
    fn extensions(&self) -> &[&'static str];

    /// Open `reader` and enumerate the tracks it contains.
    ///
    /// `extension` is the (normalised) extension that selected this codec, and
    /// may be used as a format hint.
    async fn decode(&self, reader: &FileReader, extension: &str) -> Result<Decoded>;
}
