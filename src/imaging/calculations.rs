//! Pure calculation functions for rendition dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve the width a rendition will actually be encoded at.
///
/// With upscale prevention on, a request wider than the source is capped to
/// the source width. Otherwise the request is used as-is.
///
/// # Examples
/// ```
/// # use isolay::imaging::effective_target_width;
/// assert_eq!(effective_target_width(800, 300, true), 300);
/// assert_eq!(effective_target_width(800, 300, false), 800);
/// assert_eq!(effective_target_width(400, 3000, true), 400);
/// ```
pub fn effective_target_width(requested: u32, source_width: u32, prevent_upscaling: bool) -> u32 {
    if prevent_upscaling && requested > source_width {
        source_width
    } else {
        requested
    }
}

/// Height that keeps the source aspect ratio at `width`, rounded, never below 1.
pub fn scaled_height(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    let h = (width as f64 * src_h as f64 / src_w as f64).round() as u32;
    h.max(1)
}

/// Dimensions for a fit-inside resize bounded by `width` on the horizontal axis.
///
/// The height is unbounded, so the width always governs. When `allow_enlarge`
/// is false a bound wider than the source leaves the source dimensions alone.
///
/// # Examples
/// ```
/// # use isolay::imaging::fit_inside_dimensions;
/// assert_eq!(fit_inside_dimensions((3000, 2000), 400, false), (400, 267));
/// assert_eq!(fit_inside_dimensions((300, 200), 800, false), (300, 200));
/// assert_eq!(fit_inside_dimensions((300, 200), 600, true), (600, 400));
/// ```
pub fn fit_inside_dimensions(source: (u32, u32), width: u32, allow_enlarge: bool) -> (u32, u32) {
    let (src_w, _) = source;
    if !allow_enlarge && width >= src_w {
        return source;
    }
    let width = width.max(1);
    (width, scaled_height(source, width))
}

/// Dimensions for an exact-width resize whose height is left unconstrained.
///
/// An unconstrained height is derived from the aspect ratio rather than left
/// at the source height, so the output is never distorted.
pub fn free_height_dimensions(source: (u32, u32), width: u32) -> (u32, u32) {
    let width = width.max(1);
    (width, scaled_height(source, width))
}
