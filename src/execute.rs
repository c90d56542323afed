//! Rendition execution: one planned spec in, one encoded result out.
//!
//! ```text
//! identify (true dimensions) → effective width → target size → transcode
//! ```
//!
//! The executor never trusts the dimensions cached on the [`SourceImage`];
//! it asks the codec every time. All pixel work is delegated to an
//! [`ImageCodec`], so tests drive this with the recording mock.

use crate::imaging::{
    CodecError, ImageCodec, OutputFormat, TranscodeParams, fit_inside_dimensions,
    free_height_dimensions,
};
use crate::plan::{RenditionSpec, ResizeMode};
use crate::source::SourceImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<CodecError> for ExecutionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decode(msg) => Self::Decode(msg),
            CodecError::Encode(msg) => Self::Encode(msg),
        }
    }
}

/// A successfully encoded rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionResult {
    /// Width asked for by the plan, before upscale prevention.
    pub requested_width: u32,
    /// Width actually encoded.
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

impl RenditionResult {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// A rendition that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionFailure {
    pub requested_width: u32,
    pub error: ExecutionError,
}

/// Produce one rendition of `source` as described by `spec`.
pub fn execute(
    codec: &impl ImageCodec,
    source: &SourceImage,
    spec: &RenditionSpec,
) -> Result<RenditionResult, ExecutionError> {
    let dims = codec.identify(source.bytes())?;
    let effective = spec.effective_width(dims.width);

    let (width, height) = match spec.resize_mode {
        ResizeMode::FitInside => {
            fit_inside_dimensions(dims.as_tuple(), effective, !spec.prevent_upscaling)
        }
        ResizeMode::FreeHeight => free_height_dimensions(dims.as_tuple(), effective),
    };

    tracing::debug!(
        name = source.name(),
        requested = spec.requested_width,
        width,
        height,
        format = %spec.format,
        "encoding rendition"
    );

    let encoded = codec.transcode(
        source.bytes(),
        &TranscodeParams {
            width,
            height,
            format: spec.format,
            quality: spec.quality,
            strip_metadata: spec.strip_metadata,
        },
    )?;

    Ok(RenditionResult {
        requested_width: spec.requested_width,
        width: encoded.width,
        height: encoded.height,
        format: spec.format,
        bytes: encoded.bytes,
    })
}
