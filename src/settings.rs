//! Global optimization settings shared between the front end and the orchestrator.
//!
//! [`OptimizeSettings`] is the value the front end edits (format, widths,
//! quality, flags). [`SettingsHandle`] wraps it for sharing: the front end
//! keeps editing through the handle while a batch runs, and the orchestrator
//! takes a fresh [`snapshot`](SettingsHandle::snapshot) at the moment each
//! job starts. A change made while job 1 is encoding therefore applies to
//! job 2 onwards, never to a job already in flight.

use crate::imaging::{OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Widths the front end offers as one-click presets.
pub const PRESET_WIDTHS: [u32; 4] = [400, 800, 1200, 1600];

/// User-selected optimization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeSettings {
    /// Output format for every rendition.
    pub format: OutputFormat,
    /// Predefined widths, kept sorted and free of duplicates.
    pub widths: BTreeSet<u32>,
    /// One extra width typed in by the user. Zero counts as unset.
    pub custom_width: Option<u32>,
    /// Encoding quality (1–100).
    pub quality: Quality,
    /// Never produce a rendition wider than the source.
    pub prevent_upscaling: bool,
    /// Keep the source aspect ratio (fit inside) instead of a free-height resize.
    pub preserve_aspect_ratio: bool,
    /// Carry EXIF/ICC/comments into the renditions.
    pub preserve_metadata: bool,
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            widths: BTreeSet::from([400, 800]),
            custom_width: None,
            quality: Quality::new(80),
            prevent_upscaling: true,
            preserve_aspect_ratio: true,
            preserve_metadata: false,
        }
    }
}

impl OptimizeSettings {
    /// Add `width` if absent, remove it if present. Zero is ignored.
    pub fn toggle_width(&mut self, width: u32) {
        if width == 0 {
            return;
        }
        if !self.widths.remove(&width) {
            self.widths.insert(width);
        }
    }

    pub fn set_custom_width(&mut self, width: Option<u32>) {
        self.custom_width = width.filter(|&w| w > 0);
    }

    pub fn set_quality(&mut self, quality: u32) {
        self.quality = Quality::new(quality);
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    pub fn set_prevent_upscaling(&mut self, prevent: bool) {
        self.prevent_upscaling = prevent;
    }

    pub fn set_preserve_aspect_ratio(&mut self, preserve: bool) {
        self.preserve_aspect_ratio = preserve;
    }

    pub fn set_preserve_metadata(&mut self, preserve: bool) {
        self.preserve_metadata = preserve;
    }

    /// Restore the stock defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Predefined widths plus the custom width, positive, deduplicated, ascending.
    pub fn all_widths(&self) -> Vec<u32> {
        let mut all: BTreeSet<u32> = self.widths.iter().copied().filter(|&w| w > 0).collect();
        if let Some(custom) = self.custom_width.filter(|&w| w > 0) {
            all.insert(custom);
        }
        all.into_iter().collect()
    }
}

/// Shared, mutable settings.
///
/// Cloning the handle shares the same settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<OptimizeSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: OptimizeSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// The settings as they are right now.
    pub fn snapshot(&self) -> OptimizeSettings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Edit the settings in place.
    pub fn update(&self, edit: impl FnOnce(&mut OptimizeSettings)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        edit(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_front_end() {
        let s = OptimizeSettings::default();
        assert_eq!(s.format, OutputFormat::Jpeg);
        assert_eq!(s.all_widths(), vec![400, 800]);
        assert_eq!(s.custom_width, None);
        assert_eq!(s.quality.value(), 80);
        assert!(s.prevent_upscaling);
        assert!(s.preserve_aspect_ratio);
        assert!(!s.preserve_metadata);
    }

    #[test]
    fn toggle_width_adds_and_removes() {
        let mut s = OptimizeSettings::default();
        s.toggle_width(1600);
        s.toggle_width(1200);
        assert_eq!(s.all_widths(), vec![400, 800, 1200, 1600]);

        s.toggle_width(400);
        assert_eq!(s.all_widths(), vec![800, 1200, 1600]);
    }

    #[test]
    fn toggling_every_preset_selects_the_missing_ones() {
        let mut s = OptimizeSettings::default();
        for w in PRESET_WIDTHS {
            s.toggle_width(w);
        }
        // 400 and 800 were on by default, so they flip off
        assert_eq!(s.all_widths(), vec![1200, 1600]);
    }

    #[test]
    fn toggle_zero_width_is_ignored() {
        let mut s = OptimizeSettings::default();
        s.toggle_width(0);
        assert_eq!(s.all_widths(), vec![400, 800]);
    }

    #[test]
    fn custom_width_merges_and_dedupes() {
        let mut s = OptimizeSettings::default();
        s.set_custom_width(Some(600));
        assert_eq!(s.all_widths(), vec![400, 600, 800]);

        s.set_custom_width(Some(800));
        assert_eq!(s.all_widths(), vec![400, 800]);
    }

    #[test]
    fn zero_custom_width_is_unset() {
        let mut s = OptimizeSettings::default();
        s.set_custom_width(Some(0));
        assert_eq!(s.custom_width, None);
    }

    #[test]
    fn quality_setter_clamps() {
        let mut s = OptimizeSettings::default();
        s.set_quality(0);
        assert_eq!(s.quality.value(), 1);
        s.set_quality(500);
        assert_eq!(s.quality.value(), 100);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = OptimizeSettings::default();
        s.set_format(OutputFormat::Avif);
        s.toggle_width(400);
        s.set_preserve_metadata(true);
        s.reset();
        assert_eq!(s, OptimizeSettings::default());
    }

    #[test]
    fn handle_shares_updates_between_clones() {
        let handle = SettingsHandle::new(OptimizeSettings::default());
        let front_end = handle.clone();

        let before = handle.snapshot();
        front_end.update(|s| s.set_format(OutputFormat::Png));

        assert_eq!(before.format, OutputFormat::Jpeg);
        assert_eq!(handle.snapshot().format, OutputFormat::Png);
    }

    #[test]
    fn settings_deserialize_partial_toml() {
        let s: OptimizeSettings = toml::from_str("format = \"webp\"\nwidths = [1200]").unwrap();
        assert_eq!(s.format, OutputFormat::WebP);
        assert_eq!(s.all_widths(), vec![1200]);
        assert_eq!(s.quality.value(), 80);
    }
}
