//! Metadata carry-over through `img-parts`.
//!
//! The source container is read once per transcode: ICC profile, EXIF blob,
//! and for JPEG sources the XMP (APP1) and comment (COM) segments. Those are
//! written back into the freshly encoded output container.
//!
//! | Output | ICC | EXIF | XMP / COM |
//! |---|---|---|---|
//! | JPEG | yes | yes | yes (JPEG sources) |
//! | PNG, WebP | yes | yes | no |
//! | AVIF, TIFF | via the `image` encoder | no | no |
//! | GIF | no | no | no |

use super::backend::CodecError;
use super::params::OutputFormat;
use img_parts::jpeg::{Jpeg, JpegSegment, markers};
use img_parts::{Bytes, DynImage, ImageEXIF, ImageICC};

const XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Metadata pulled from a source image.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    icc: Option<Bytes>,
    exif: Option<Bytes>,
    jpeg_extras: Vec<JpegSegment>,
}

impl SourceMetadata {
    /// Read whatever the source container carries. Unknown containers (GIF)
    /// and unparseable ones yield empty metadata.
    pub fn read(bytes: &[u8]) -> Self {
        let data = Bytes::copy_from_slice(bytes);
        let mut meta = match DynImage::from_bytes(data.clone()) {
            Ok(Some(img)) => Self {
                icc: img.icc_profile(),
                exif: img.exif(),
                jpeg_extras: Vec::new(),
            },
            _ => return Self::default(),
        };
        if let Ok(jpeg) = Jpeg::from_bytes(data) {
            meta.jpeg_extras = jpeg
                .segments()
                .iter()
                .filter(|s| is_xmp(s) || s.marker() == markers::COM)
                .cloned()
                .collect();
        }
        meta
    }

    pub fn icc(&self) -> Option<&[u8]> {
        self.icc.as_deref()
    }

    pub fn exif(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.icc.is_none() && self.exif.is_none() && self.jpeg_extras.is_empty()
    }
}

fn is_xmp(segment: &JpegSegment) -> bool {
    segment.marker() == markers::APP1 && segment.contents().starts_with(XMP_PREFIX)
}

fn container_error(format: OutputFormat, e: impl std::fmt::Display) -> CodecError {
    CodecError::Encode(format!("{} metadata embed failed: {e}", format.name()))
}

/// Write `meta` into an encoded `format` container.
///
/// Formats without an `img-parts` container come back untouched.
pub fn embed(
    encoded: Vec<u8>,
    format: OutputFormat,
    meta: &SourceMetadata,
) -> Result<Vec<u8>, CodecError> {
    if meta.is_empty() {
        return Ok(encoded);
    }
    let mut output = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let mut jpeg =
                Jpeg::from_bytes(Bytes::from(encoded)).map_err(|e| container_error(format, e))?;
            jpeg.set_icc_profile(meta.icc.clone());
            jpeg.set_exif(meta.exif.clone());
            // After the last APPn so JFIF/EXIF stay first
            let segments = jpeg.segments_mut();
            let at = segments
                .iter()
                .rposition(|s| (markers::APP0..=markers::APP15).contains(&s.marker()))
                .map_or(0, |i| i + 1);
            for (offset, segment) in meta.jpeg_extras.iter().enumerate() {
                segments.insert(at + offset, segment.clone());
            }
            jpeg.encoder()
                .write_to(&mut output)
                .map_err(|e| container_error(format, e))?;
        }
        OutputFormat::Png | OutputFormat::WebP => {
            let mut img = DynImage::from_bytes(Bytes::from(encoded))
                .map_err(|e| container_error(format, e))?
                .ok_or_else(|| container_error(format, "unrecognized container"))?;
            img.set_icc_profile(meta.icc.clone());
            img.set_exif(meta.exif.clone());
            img.encoder()
                .write_to(&mut output)
                .map_err(|e| container_error(format, e))?;
        }
        OutputFormat::Avif | OutputFormat::Tiff | OutputFormat::Gif => return Ok(encoded),
    }
    Ok(output)
}
