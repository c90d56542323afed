//! Rendition planning.
//!
//! Turns the global settings plus one source image into the ordered list of
//! renditions to produce. Pure: no I/O, no codec calls, same input same output.
//!
//! ```text
//! widths {400, 800} + custom 600, source 3000×2000
//!   → [400, 600, 800]  (ascending, deduplicated, zero ignored)
//! ```
//!
//! Every spec inherits format, quality and flags verbatim from the settings;
//! only the requested width varies.

use crate::imaging::{OutputFormat, Quality, effective_target_width};
use crate::settings::OptimizeSettings;
use crate::source::SourceImage;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("source reports unusable dimensions {width}x{height}")]
    UnusableDimensions { width: u32, height: u32 },
}

/// How a rendition is scaled to its target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Scale to the target width, height follows the aspect ratio, no cropping.
    FitInside,
    /// Exact target width with the height left unconstrained.
    FreeHeight,
}

/// One planned rendition. Immutable once planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenditionSpec {
    pub requested_width: u32,
    pub resize_mode: ResizeMode,
    pub prevent_upscaling: bool,
    pub format: OutputFormat,
    pub quality: Quality,
    pub strip_metadata: bool,
}

impl RenditionSpec {
    /// Width this spec resolves to against a source `source_width` pixels wide.
    pub fn effective_width(&self, source_width: u32) -> u32 {
        effective_target_width(self.requested_width, source_width, self.prevent_upscaling)
    }
}

/// Plan the renditions of `source` under `settings`, ascending by requested width.
///
/// An empty result is not an error: the caller flags the job as having
/// nothing planned.
pub fn plan(settings: &OptimizeSettings, source: &SourceImage) -> Result<Vec<RenditionSpec>, PlanError> {
    let dims = source.dimensions();
    if dims.width == 0 || dims.height == 0 {
        return Err(PlanError::UnusableDimensions {
            width: dims.width,
            height: dims.height,
        });
    }

    let resize_mode = if settings.preserve_aspect_ratio {
        ResizeMode::FitInside
    } else {
        ResizeMode::FreeHeight
    };

    Ok(settings
        .all_widths()
        .into_iter()
        .map(|requested_width| RenditionSpec {
            requested_width,
            resize_mode,
            prevent_upscaling: settings.prevent_upscaling,
            format: settings.format,
            quality: settings.quality,
            strip_metadata: !settings.preserve_metadata,
        })
        .collect())
}
