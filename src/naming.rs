//! Download file names for renditions.
//!
//! Every rendition is saved as
//!
//! ```text
//! <original name without extension>-<width>w-<suffix>.<ext>
//! ```
//!
//! - `photo.jpg`, 800 px WebP → `photo-800w-isolay.webp`
//! - `holiday.final.png`, 400 px JPEG → `holiday.final-400w-isolay.jpeg`
//!
//! The extension comes from the output mime subtype (`image/jpeg` → `jpeg`),
//! with any parameters dropped. The unmodified original keeps its own
//! extension and has no width segment: `photo-isolay.jpg`.
//!
//! Two sources with the same stem (`a/photo.jpg`, `b/photo.png`) would map to
//! the same name; [`unique_file_name`] numbers the later ones the way browsers
//! number repeated downloads: `photo-800w-isolay (1).webp`.

use std::collections::HashSet;

/// Suffix appended to every download name unless configured otherwise.
pub const DEFAULT_SUFFIX: &str = "isolay";

/// Extension used when a mime type has no usable subtype.
const FALLBACK_RENDITION_EXT: &str = "webp";

/// Extension used when the original name has none.
const FALLBACK_ORIGINAL_EXT: &str = "jpg";

/// Drop the last `.ext` from a file name. Names without one come back unchanged.
///
/// A leading dot (`.hidden`) is not treated as an extension.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() && !name[pos + 1..].contains('/') => {
            &name[..pos]
        }
        _ => name,
    }
}

/// The extension after the last dot, if any.
fn extension_of(name: &str) -> Option<&str> {
    let stem = strip_extension(name);
    (stem.len() < name.len()).then(|| &name[stem.len() + 1..])
}

/// File extension for a mime type: the subtype with parameters removed.
///
/// ```
/// # use isolay::naming::extension_for_mime;
/// assert_eq!(extension_for_mime("image/avif"), "avif");
/// assert_eq!(extension_for_mime("image/jpeg; q=0.9"), "jpeg");
/// assert_eq!(extension_for_mime("garbage"), "webp");
/// ```
pub fn extension_for_mime(mime: &str) -> &str {
    mime.split_once('/')
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or("").trim())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(FALLBACK_RENDITION_EXT)
}

/// Download name for a rendition encoded at `width` pixels.
pub fn rendition_file_name(original: &str, width: u32, mime: &str, suffix: &str) -> String {
    format!(
        "{}-{}w-{}.{}",
        strip_extension(original),
        width,
        suffix,
        extension_for_mime(mime)
    )
}

/// Download name for the unmodified original.
pub fn original_file_name(original: &str, suffix: &str) -> String {
    let ext = extension_of(original).unwrap_or(FALLBACK_ORIGINAL_EXT);
    format!("{}-{}.{}", strip_extension(original), suffix, ext)
}

/// `name`, or `name` with ` (n)` before its extension, whichever `taken` does
/// not hold yet. Names are compared case-insensitively; `taken` holds
/// lowercased names.
pub fn unique_file_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(&name.to_lowercase()) {
        return name.to_string();
    }
    let stem = strip_extension(name);
    let ext = extension_of(name);
    (1u32..)
        .map(|n| match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        })
        .find(|candidate| !taken.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendition_name_uses_width_and_mime() {
        assert_eq!(
            rendition_file_name("photo.jpg", 800, "image/webp", DEFAULT_SUFFIX),
            "photo-800w-isolay.webp"
        );
    }

    #[test]
    fn rendition_name_keeps_inner_dots() {
        assert_eq!(
            rendition_file_name("holiday.final.png", 400, "image/jpeg", DEFAULT_SUFFIX),
            "holiday.final-400w-isolay.jpeg"
        );
    }

    #[test]
    fn rendition_name_without_extension() {
        assert_eq!(
            rendition_file_name("scan", 1200, "image/png", DEFAULT_SUFFIX),
            "scan-1200w-isolay.png"
        );
    }

    #[test]
    fn rendition_name_custom_suffix() {
        assert_eq!(
            rendition_file_name("a.gif", 100, "image/gif", "small"),
            "a-100w-small.gif"
        );
    }

    #[test]
    fn mime_parameters_are_dropped() {
        assert_eq!(extension_for_mime("image/webp;charset=binary"), "webp");
    }

    #[test]
    fn mime_without_subtype_falls_back() {
        assert_eq!(extension_for_mime("image/"), "webp");
        assert_eq!(extension_for_mime(""), "webp");
    }

    #[test]
    fn original_name_keeps_its_extension() {
        assert_eq!(original_file_name("photo.png", DEFAULT_SUFFIX), "photo-isolay.png");
    }

    #[test]
    fn original_name_without_extension_defaults_to_jpg() {
        assert_eq!(original_file_name("photo", DEFAULT_SUFFIX), "photo-isolay.jpg");
    }

    #[test]
    fn strip_extension_cases() {
        assert_eq!(strip_extension("a.b.c"), "a.b");
        assert_eq!(strip_extension("plain"), "plain");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("trailing."), "trailing.");
    }

    #[test]
    fn unique_name_passes_free_names_through() {
        let taken = HashSet::from(["other.webp".to_string()]);
        assert_eq!(unique_file_name("photo.webp", &taken), "photo.webp");
    }

    #[test]
    fn unique_name_numbers_repeats() {
        let mut taken = HashSet::new();
        for expected in ["photo-800w-isolay.webp", "photo-800w-isolay (1).webp", "photo-800w-isolay (2).webp"] {
            let name = unique_file_name("photo-800w-isolay.webp", &taken);
            assert_eq!(name, expected);
            taken.insert(name.to_lowercase());
        }
    }

    #[test]
    fn unique_name_ignores_case() {
        let taken = HashSet::from(["photo-isolay.jpg".to_string()]);
        assert_eq!(unique_file_name("Photo-isolay.JPG", &taken), "Photo-isolay (1).JPG");
        assert_eq!(unique_file_name("scan", &HashSet::from(["scan".to_string()])), "scan (1)");
    }
}
