//! Container decoding for cumulus.
//!
//! A [`Codec`] turns the bytes behind a [`FileReader`](cumulus_storage::FileReader)
//! into zero or more [`Song`]s. The [`CodecRegistry`] picks a codec by file
//! extension, so files nobody can play are dismissed without being fetched.

mod codec;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod models;
#[cfg(feature = "symphonia")]
mod probe;
mod registry;
mod song;

pub use crate::codec::{Codec, CodecHandle};
pub use crate::models::{Decoded, SongInfo, TrackStream};
#[cfg(feature = "symphonia")]
pub use crate::probe::SymphoniaCodec;
pub use crate::registry::CodecRegistry;
pub use crate::song::Song;
