//! Image codec adapter.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 via `resize_exact` |
//! | **Encode** | `image` encoders for JPEG, PNG, AVIF, GIF, TIFF; `webp` (libwebp) for WebP |
//! | **Metadata carry-over** | ICC, EXIF, XMP, COM via [`metadata`] (`img-parts`) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a transcode
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]

pub mod backend;
mod calculations;
pub(crate) mod metadata;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, Dimensions, Encoded, ImageCodec};
pub use calculations::{
    effective_target_width, fit_inside_dimensions, free_height_dimensions, scaled_height,
};
pub use params::{OutputFormat, Quality, TranscodeParams};
pub use rust_backend::{RustCodec, has_supported_extension, supported_input_extensions};
