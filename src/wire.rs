//! Single-rendition request/response wire format.
//!
//! One request carries the raw file bytes plus loosely-typed string fields,
//! the way an HTML form posts them. One response carries the encoded image
//! as a base64 data URL.
//!
//! ## Request fields
//!
//! | Field | Parsing | Default |
//! |---|---|---|
//! | `file` | raw bytes | required (400 without it) |
//! | `width` | leading digits, `"800px"` → 800 | 1920 when absent, unparseable or zero |
//! | `quality` | leading digits | 80 when absent, unparseable or zero |
//! | `format` | case-insensitive name, unknown → webp | webp when absent or empty |
//! | `preserveAspectRatio` | exactly `"true"` | false |
//! | `preventUpscaling` | exactly `"true"` | false |
//! | `removeMetadata` | exactly `"true"` | false |
//!
//! ## Responses
//!
//! ```text
//! 200 {"success":true,"dataUrl":"data:image/webp;base64,…","optimizedSize":1234,"format":"image/webp","width":800}
//! 400 {"error":"No file provided"}
//! 500 {"error":"Failed to optimize image","details":"…"}
//! ```

use crate::execute::{ExecutionError, execute};
use crate::imaging::{ImageCodec, OutputFormat, Quality};
use crate::plan::{RenditionSpec, ResizeMode};
use crate::source::SourceImage;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_QUALITY: u32 = 80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("No file provided")]
    MissingFile,
    #[error("Failed to optimize image")]
    Optimize(#[from] ExecutionError),
}

impl WireError {
    pub fn status(&self) -> u16 {
        match self {
            Self::MissingFile => 400,
            Self::Optimize(_) => 500,
        }
    }
}

/// A request as received: bytes plus raw string fields.
#[derive(Debug, Clone, Default)]
pub struct RenditionRequest {
    pub file: Option<Vec<u8>>,
    pub width: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
    pub preserve_aspect_ratio: Option<String>,
    pub prevent_upscaling: Option<String>,
    pub remove_metadata: Option<String>,
}

/// Parsed request parameters with every default applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireParams {
    pub width: u32,
    pub quality: Quality,
    pub format: OutputFormat,
    pub preserve_aspect_ratio: bool,
    pub prevent_upscaling: bool,
    pub remove_metadata: bool,
}

impl WireParams {
    pub fn from_request(request: &RenditionRequest) -> Self {
        let format = request
            .format
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(OutputFormat::parse)
            .unwrap_or(OutputFormat::WebP);

        Self {
            width: positive_or(request.width.as_deref(), DEFAULT_WIDTH),
            quality: Quality::new(positive_or(request.quality.as_deref(), DEFAULT_QUALITY)),
            format,
            preserve_aspect_ratio: is_true(request.preserve_aspect_ratio.as_deref()),
            prevent_upscaling: is_true(request.prevent_upscaling.as_deref()),
            remove_metadata: is_true(request.remove_metadata.as_deref()),
        }
    }

    fn spec(&self) -> RenditionSpec {
        RenditionSpec {
            requested_width: self.width,
            resize_mode: if self.preserve_aspect_ratio {
                ResizeMode::FitInside
            } else {
                ResizeMode::FreeHeight
            },
            prevent_upscaling: self.prevent_upscaling,
            format: self.format,
            quality: self.quality,
            strip_metadata: self.remove_metadata,
        }
    }
}

/// Parse the leading decimal digits of `input`, after optional whitespace and `+`.
///
/// `"800px"` → 800, `" 42"` → 42, `"abc"` → None, `"-5"` → None.
pub fn parse_leading_int(input: &str) -> Option<u32> {
    let trimmed = input.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    unsigned[..end].parse().ok()
}

fn positive_or(input: Option<&str>, default: u32) -> u32 {
    input
        .and_then(parse_leading_int)
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

fn is_true(input: Option<&str>) -> bool {
    input == Some("true")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub success: bool,
    pub data_url: String,
    pub optimized_size: usize,
    pub format: String,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&WireError> for ErrorResponse {
    fn from(err: &WireError) -> Self {
        Self {
            error: err.to_string(),
            details: match err {
                WireError::MissingFile => None,
                WireError::Optimize(inner) => Some(inner.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success(OptimizeResponse),
    Failure(ErrorResponse),
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl WireResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}

/// Encode bytes as a `data:` URL.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Handle one request end to end. Never fails: errors become 400/500 responses.
pub fn handle(codec: &impl ImageCodec, request: RenditionRequest) -> WireResponse {
    match optimize(codec, request) {
        Ok(body) => WireResponse {
            status: 200,
            body: ResponseBody::Success(body),
        },
        Err(err) => {
            tracing::warn!(error = ?err, "request failed");
            WireResponse {
                status: err.status(),
                body: ResponseBody::Failure(ErrorResponse::from(&err)),
            }
        }
    }
}

fn optimize(codec: &impl ImageCodec, request: RenditionRequest) -> Result<OptimizeResponse, WireError> {
    let params = WireParams::from_request(&request);
    let bytes = request.file.ok_or(WireError::MissingFile)?;

    let dims = codec.identify(&bytes).map_err(ExecutionError::from)?;
    let mime = image::guess_format(&bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    let source = SourceImage::from_parts("upload", bytes, dims, mime);

    let result = execute(codec, &source, &params.spec())?;
    Ok(OptimizeResponse {
        success: true,
        data_url: data_url(result.mime_type(), &result.bytes),
        optimized_size: result.byte_size(),
        format: result.mime_type().to_string(),
        width: result.width,
    })
}
