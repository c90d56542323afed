//! CLI output formatting.
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! photo.jpg 3000x2000 (1.2 MB, image/jpeg)
//!     400w → 400x267 jpeg q80 → photo-400w-isolay.jpeg
//!     800w → 800x533 jpeg q80 → photo-800w-isolay.jpeg
//! ```
//!
//! ## Optimize (live progress)
//!
//! ```text
//! Optimizing 2 images
//! #0 photo.jpg (2 renditions)
//!     400w → 400x267, 31.2 KB [50%]
//!     800w failed: encode failed: … [100%]
//!     complete: 1 rendition, 1 failed
//! ```
//!
//! ## Summary
//!
//! ```text
//! 001 photo.jpg (1.2 MB)
//!     photo-400w-isolay.jpeg 31.2 KB (-97%)
//!
//! 1 complete, 0 failed, 0 nothing planned
//! ```

use crate::export::Download;
use crate::imaging::{fit_inside_dimensions, free_height_dimensions};
use crate::naming::rendition_file_name;
use crate::orchestrate::{BatchEvent, BatchSummary, RenditionOutcome};
use crate::plan::{RenditionSpec, ResizeMode};
use crate::registry::{ImageJob, JobState};
use crate::source::{SourceImage, ValidationError};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable byte count, base 1024, at most two decimals.
///
/// ```
/// # use isolay::output::format_file_size;
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(2_453_667), "2.34 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Size change from `original` to `optimized` in whole percent. Negative means smaller.
pub fn size_change_percent(original: u64, optimized: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    ((optimized as f64 / original as f64 - 1.0) * 100.0).round() as i64
}

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// plan
// ============================================================================

/// Format the planned renditions of one source without encoding anything.
pub fn format_plan(source: &SourceImage, specs: &[RenditionSpec], suffix: &str) -> Vec<String> {
    let dims = source.dimensions();
    let mut lines = vec![format!(
        "{} {}x{} ({}, {})",
        source.name(),
        dims.width,
        dims.height,
        format_file_size(source.byte_size() as u64),
        source.mime_type()
    )];

    if specs.is_empty() {
        lines.push("    nothing planned: no widths selected".to_string());
        return lines;
    }

    for spec in specs {
        let effective = spec.effective_width(dims.width);
        let (w, h) = match spec.resize_mode {
            ResizeMode::FitInside => {
                fit_inside_dimensions(dims.as_tuple(), effective, !spec.prevent_upscaling)
            }
            ResizeMode::FreeHeight => free_height_dimensions(dims.as_tuple(), effective),
        };
        let quality = if spec.format.uses_quality() {
            format!(" q{}", spec.quality.value())
        } else {
            String::new()
        };
        lines.push(format!(
            "    {}w \u{2192} {}x{} {}{} \u{2192} {}",
            spec.requested_width,
            w,
            h,
            spec.format,
            quality,
            rendition_file_name(source.name(), w, spec.format.mime_type(), suffix)
        ));
    }
    lines
}

pub fn print_plan(source: &SourceImage, specs: &[RenditionSpec], suffix: &str) {
    for line in format_plan(source, specs, suffix) {
        println!("{}", line);
    }
}

// ============================================================================
// optimize
// ============================================================================

/// Format rejected submissions.
pub fn format_rejections(rejected: &[ValidationError]) -> Vec<String> {
    rejected.iter().map(|e| format!("Skipped {e}")).collect()
}

pub fn print_rejections(rejected: &[ValidationError]) {
    for line in format_rejections(rejected) {
        println!("{}", line);
    }
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::BatchStarted { jobs } => vec![format!("Optimizing {}", plural(*jobs, "image"))],
        BatchEvent::JobStarted { id, name, planned } => {
            vec![format!("{} {} ({})", id, name, plural(*planned, "rendition"))]
        }
        BatchEvent::RenditionFinished {
            requested_width,
            outcome,
            progress,
            ..
        } => {
            let line = match outcome {
                RenditionOutcome::Encoded {
                    width,
                    height,
                    byte_size,
                } => format!(
                    "    {}w \u{2192} {}x{}, {}",
                    requested_width,
                    width,
                    height,
                    format_file_size(*byte_size as u64)
                ),
                RenditionOutcome::Failed(reason) => {
                    format!("    {}w failed: {}", requested_width, reason)
                }
            };
            vec![format!("{line} [{progress}%]")]
        }
        BatchEvent::JobFinished {
            id,
            name,
            state,
            renditions,
            failures,
            error,
        } => {
            let line = match state {
                JobState::Complete if *failures > 0 => format!(
                    "    complete: {}, {} failed",
                    plural(*renditions, "rendition"),
                    failures
                ),
                JobState::Complete => format!("    complete: {}", plural(*renditions, "rendition")),
                JobState::NothingPlanned => "    nothing planned: no widths selected".to_string(),
                _ => match error {
                    Some(msg) => format!("{} {} error: {}", id, name, msg),
                    None => format!("    error: all {} failed", plural(*failures, "rendition")),
                },
            };
            vec![line]
        }
    }
}

// ============================================================================
// summary
// ============================================================================

/// Format the end-of-batch summary: every job with its renditions and size change.
/// Per-job sizes and savings, then the batch totals.
///
/// File names are taken from `downloads`, so they match what was written.
pub fn format_summary(
    jobs: &[ImageJob],
    summary: &BatchSummary,
    downloads: &[Download<'_>],
) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, job) in jobs.iter().enumerate() {
        let original = job.source.byte_size() as u64;
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            job.source.name(),
            format_file_size(original)
        ));
        if job.state != JobState::Complete {
            lines.push(format!("    {}", job.state));
            continue;
        }
        for r in &job.renditions {
            let size = r.byte_size() as u64;
            let name = downloads
                .iter()
                .find(|d| d.job == job.id && d.width == Some(r.width))
                .map_or("(not written)", |d| d.file_name.as_str());
            lines.push(format!(
                "    {} {} ({:+}%)",
                name,
                format_file_size(size),
                size_change_percent(original, size)
            ));
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    let mut totals = format!(
        "{} complete, {} failed, {} nothing planned",
        summary.complete, summary.failed, summary.nothing_planned
    );
    if summary.dropped > 0 {
        totals.push_str(&format!(", {} removed", summary.dropped));
    }
    lines.push(totals);
    lines
}

pub fn print_summary(jobs: &[ImageJob], summary: &BatchSummary, downloads: &[Download<'_>]) {
    for line in format_summary(jobs, summary, downloads) {
        println!("{}", line);
    }
}
