//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the two operations every codec must
//! support: identify (read true pixel dimensions from raw bytes) and
//! transcode (decode, resize, encode).
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.
//! Tests use the recording mock in [`tests`].

use super::params::TranscodeParams;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Output of a transcode: encoded bytes plus the dimensions actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Trait for image codecs.
///
/// Implementations hold no per-call state, so one codec is shared by every
/// job in a batch (and across rayon workers when jobs run in parallel).
pub trait ImageCodec: Sync {
    /// Read the pixel dimensions stored in `bytes`.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, CodecError>;

    /// Decode `bytes`, resize to the requested dimensions, and encode.
    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Encoded, CodecError>;
}
