//! Submitted source images and their validation.
//!
//! A [`SourceImage`] is created once per accepted file and never mutated. The
//! bytes sit behind an `Arc` so the orchestrator can hand them to the codec
//! after releasing the registry lock, without copying the file.
//!
//! Validation happens at submission time: empty input, an unsupported
//! container, or a header the decoder cannot read are reported back to the
//! caller and the file never enters the registry.

use crate::imaging::Dimensions;
use crate::registry::{JobId, SharedRegistry};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}: file is empty")]
    Empty(String),
    #[error("{name}: unsupported image type ({detected}); expected JPEG, PNG, WEBP or GIF")]
    UnsupportedType { name: String, detected: String },
    #[error("{name}: cannot read image header: {reason}")]
    Undecodable { name: String, reason: String },
}

/// Source containers accepted for submission.
const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Immutable handle to one submitted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    name: String,
    bytes: Arc<[u8]>,
    dimensions: Dimensions,
    mime_type: &'static str,
}

impl SourceImage {
    /// Validate `bytes` and read the true pixel dimensions from the header.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(ValidationError::Empty(name));
        }

        let format = match image::guess_format(&bytes) {
            Ok(format) if ACCEPTED_FORMATS.contains(&format) => format,
            Ok(other) => {
                return Err(ValidationError::UnsupportedType {
                    name,
                    detected: format!("{other:?}").to_lowercase(),
                });
            }
            Err(_) => {
                return Err(ValidationError::UnsupportedType {
                    name,
                    detected: "unknown".to_string(),
                });
            }
        };

        let (width, height) = ImageReader::with_format(Cursor::new(bytes.as_slice()), format)
            .into_dimensions()
            .map_err(|e| ValidationError::Undecodable {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            bytes: bytes.into(),
            dimensions: Dimensions { width, height },
            mime_type: format.to_mime_type(),
        })
    }

    /// Build a handle from already-known parts, skipping validation.
    pub fn from_parts(
        name: impl Into<String>,
        bytes: Vec<u8>,
        dimensions: Dimensions,
        mime_type: &'static str,
    ) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            dimensions,
            mime_type,
        }
    }

    /// Original file name, as submitted.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Dimensions read at submission.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Mime type of the submitted container, e.g. `image/png`.
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}

/// Outcome of [`submit_images`].
#[derive(Debug, Default)]
pub struct SubmitReport {
    pub accepted: Vec<JobId>,
    pub rejected: Vec<ValidationError>,
}

/// Validate each `(name, bytes)` pair and append the valid ones to the registry as idle jobs.
pub fn submit_images<I, S>(registry: &SharedRegistry, files: I) -> SubmitReport
where
    I: IntoIterator<Item = (S, Vec<u8>)>,
    S: Into<String>,
{
    let mut report = SubmitReport::default();
    for (name, bytes) in files {
        match SourceImage::from_bytes(name, bytes) {
            Ok(source) => {
                tracing::debug!(
                    name = source.name(),
                    width = source.dimensions().width,
                    height = source.dimensions().height,
                    "accepted image"
                );
                report.accepted.push(registry.write(|r| r.add(source)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected image");
                report.rejected.push(e);
            }
        }
    }
    report
}
