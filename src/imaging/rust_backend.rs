//! Pure Rust codec built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, WebP, GIF, TIFF) | `image` crate decoders |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder` at the requested quality |
//! | Encode → PNG | `PngEncoder`, best compression, adaptive filtering |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy) at the requested quality |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) at the requested quality |
//! | Encode → GIF | `GifEncoder` (NeuQuant palette) |
//! | Encode → TIFF | `TiffEncoder` |
//! | ICC/EXIF/XMP/comment carry-over | [`metadata`](super::metadata) (`img-parts`); AVIF/TIFF ICC via `ImageEncoder::set_icc_profile` |

use super::backend::{CodecError, Dimensions, Encoded, ImageCodec};
use super::metadata::{self, SourceMetadata};
use super::params::{OutputFormat, Quality, TranscodeParams};
use image::codecs::avif::AvifEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Input file extensions the front end picks up when walking directories.
const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Returns the set of image file extensions accepted as sources.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

/// Whether `path` has one of the [supported input extensions](supported_input_extensions).
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| INPUT_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

/// GIF quantizer speed (1 = best palette, 30 = fastest).
const GIF_SPEED: i32 = 10;

/// libwebp compression method (0 = fastest, 6 = smallest output).
const WEBP_METHOD: i32 = 6;

/// Codec backed by the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, CodecError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(format!("Failed to read image header: {e}")))
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    reader(bytes)?
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// Raw pixel buffer plus its layout, as handed to an encoder.
fn pixels(img: &DynamicImage, keep_alpha: bool) -> (Vec<u8>, ExtendedColorType) {
    if keep_alpha && img.color().has_alpha() {
        (img.to_rgba8().into_raw(), ExtendedColorType::Rgba8)
    } else {
        (img.to_rgb8().into_raw(), ExtendedColorType::Rgb8)
    }
}

/// Write through any [`ImageEncoder`], attaching the ICC profile when the encoder takes one.
fn write_with<E: ImageEncoder>(
    mut encoder: E,
    img: &DynamicImage,
    keep_alpha: bool,
    icc: Option<&[u8]>,
) -> image::ImageResult<()> {
    if let Some(icc) = icc {
        if encoder.set_icc_profile(icc.to_vec()).is_err() {
            tracing::debug!("encoder does not embed ICC profiles; profile dropped");
        }
    }
    let (buf, color) = pixels(img, keep_alpha);
    encoder.write_image(&buf, img.width(), img.height(), color)
}

/// Lossy WebP through libwebp; the `image` crate only writes lossless WebP.
fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, CodecError> {
    let (buf, color) = pixels(img, true);
    let encoder = match color {
        ExtendedColorType::Rgba8 => webp::Encoder::from_rgba(&buf, img.width(), img.height()),
        _ => webp::Encoder::from_rgb(&buf, img.width(), img.height()),
    };
    let mut config = webp::WebPConfig::new()
        .map_err(|_| CodecError::Encode("webp config init failed".into()))?;
    config.quality = quality.value() as f32;
    config.method = WEBP_METHOD;
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| CodecError::Encode(format!("webp encode failed: {e:?}")))?;
    Ok(memory.to_vec())
}

/// Encode `img` into `format`. Quality reaches the JPEG, WebP and AVIF encoders.
fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
    icc: Option<&[u8]>,
) -> Result<Vec<u8>, CodecError> {
    let q = quality.value() as u8;
    let mut buffer = Vec::new();
    let cursor = Cursor::new(&mut buffer);

    let result = match format {
        OutputFormat::Jpeg => write_with(JpegEncoder::new_with_quality(cursor, q), img, false, None),
        OutputFormat::Png => write_with(
            PngEncoder::new_with_quality(cursor, CompressionType::Best, PngFilter::Adaptive),
            img,
            true,
            None,
        ),
        OutputFormat::WebP => return encode_webp(img, quality),
        OutputFormat::Avif => write_with(
            AvifEncoder::new_with_speed_quality(cursor, AVIF_SPEED, q),
            img,
            true,
            icc,
        ),
        OutputFormat::Tiff => write_with(TiffEncoder::new(cursor), img, true, icc),
        // GifEncoder is not an ImageEncoder, so it skips write_with
        OutputFormat::Gif => {
            let mut encoder = GifEncoder::new_with_speed(cursor, GIF_SPEED);
            let rgba = img.to_rgba8();
            encoder.encode(rgba.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        }
    };

    result.map_err(|e| CodecError::Encode(format!("{} encode failed: {e}", format.name())))?;
    Ok(buffer)
}

impl ImageCodec for RustCodec {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, CodecError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| CodecError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Encoded, CodecError> {
        if params.width == 0 || params.height == 0 {
            return Err(CodecError::Encode(format!(
                "Invalid target dimensions {}x{}",
                params.width, params.height
            )));
        }

        let img = decode(bytes)?;
        let resized = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };

        let meta = if params.strip_metadata {
            SourceMetadata::default()
        } else {
            SourceMetadata::read(bytes)
        };
        let encoded = encode(&resized, params.format, params.quality, meta.icc())?;
        let encoded = metadata::embed(encoded, params.format, &meta)?;

        Ok(Encoded {
            bytes: encoded,
            width: resized.width(),
            height: resized.height(),
        })
    }
}
