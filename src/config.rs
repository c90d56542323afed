//! Configuration module.
//!
//! Handles loading, validating, and merging `isolay.toml`. Stock defaults are
//! the base layer; a user config file only needs the keys it overrides, and
//! command-line flags override both.
//!
//! ## Config File Location
//!
//! `isolay.toml` in the working directory is picked up automatically. Any
//! other file can be passed with `--config <path>`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [settings]
//! format = "jpeg"              # jpeg, png, webp, avif, gif, tiff
//! widths = [400, 800]          # Rendition widths in pixels
//! # custom_width = 1000        # One extra width
//! quality = 80                 # 1-100, used by JPEG, WebP and AVIF
//! prevent_upscaling = true
//! preserve_aspect_ratio = true
//! preserve_metadata = false
//!
//! [output]
//! suffix = "isolay"            # photo.jpg → photo-800w-isolay.jpeg
//! dir = "optimized"
//! keep_originals = false       # Also write photo-isolay.jpg
//!
//! [processing]
//! max_parallel_jobs = 1        # Images encoded at once (clamped to CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming::DEFAULT_SUFFIX;
use crate::settings::OptimizeSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "isolay.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `isolay.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IsolayConfig {
    /// Default optimization settings.
    pub settings: OptimizeSettings,
    /// Where and how renditions are written.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl IsolayConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "settings.widths values must be non-zero".into(),
            ));
        }
        if self.settings.custom_width == Some(0) {
            return Err(ConfigError::Validation(
                "settings.custom_width must be non-zero".into(),
            ));
        }
        if self.output.suffix.is_empty() || self.output.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.suffix must be a non-empty file name fragment".into(),
            ));
        }
        if self.processing.max_parallel_jobs == 0 {
            return Err(ConfigError::Validation(
                "processing.max_parallel_jobs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Output naming and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Appended to every download name.
    pub suffix: String,
    /// Directory renditions are written into.
    pub dir: PathBuf,
    /// Also write each untouched original next to its renditions.
    pub keep_originals: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            dir: PathBuf::from("optimized"),
            keep_originals: false,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of images encoded at the same time.
    /// 1 processes images strictly one after another.
    /// Values larger than the core count are clamped down.
    pub max_parallel_jobs: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: 1,
        }
    }
}

/// Resolve the effective worker count from config.
///
/// `min(max_parallel_jobs, cores)`, never below 1: the user can constrain
/// down, not up.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_parallel_jobs.clamp(1, cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(IsolayConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Quality is clamped by its type on deserialize, so range-check the raw value first.
fn check_raw_quality(value: &toml::Value) -> Result<(), ConfigError> {
    let quality = value
        .get("settings")
        .and_then(|s| s.get("quality"))
        .and_then(toml::Value::as_integer);
    match quality {
        Some(q) if !(1..=100).contains(&q) => Err(ConfigError::Validation(
            "settings.quality must be 1-100".into(),
        )),
        _ => Ok(()),
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<IsolayConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    check_raw_quality(&merged)?;
    let config: IsolayConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `isolay.toml` from `dir`, falling back to stock defaults when absent.
pub fn load_config(dir: &Path) -> Result<IsolayConfig, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILE))?;
    resolve_config(stock_defaults_value()?, overlay)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<IsolayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value()?, Some(overlay))
}

/// Returns a fully-commented stock `isolay.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# isolay configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# isolay reads ./isolay.toml, or the file given with --config.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Optimization settings
# ---------------------------------------------------------------------------
[settings]
# Output format for every rendition: jpeg, png, webp, avif, gif, tiff.
# Unrecognized names fall back to webp.
format = "jpeg"

# Rendition widths in pixels. Each one produces its own file.
# Presets offered by the front end: 400, 800, 1200, 1600.
widths = [400, 800]

# One extra width on top of the list above.
# custom_width = 1000

# Encoding quality (1 = smallest, 100 = best). JPEG, WebP and AVIF use it;
# PNG, GIF and TIFF are lossless and ignore it.
quality = 80

# Never produce a rendition wider than the source image.
prevent_upscaling = true

# Keep the source aspect ratio. When false, only the width is fixed.
preserve_aspect_ratio = true

# Carry EXIF, XMP, ICC and comments into the renditions.
preserve_metadata = false

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Appended to every file name: photo.jpg -> photo-800w-isolay.jpeg
suffix = "isolay"

# Directory renditions are written into.
dir = "optimized"

# Also write each untouched original, as photo-isolay.jpg.
keep_originals = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Images encoded at the same time. 1 = one after another.
# Larger values are clamped to the number of CPU cores.
max_parallel_jobs = 1
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = IsolayConfig::default();
        assert_eq!(config.settings, OptimizeSettings::default());
        assert_eq!(config.output.suffix, "isolay");
        assert_eq!(config.output.dir, PathBuf::from("optimized"));
        assert!(!config.output.keep_originals);
        assert_eq!(config.processing.max_parallel_jobs, 1);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[settings]
format = "avif"
"#;
        let config: IsolayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.format, OutputFormat::Avif);
        // Unspecified defaults preserved
        assert_eq!(config.settings.all_widths(), vec![400, 800]);
        assert_eq!(config.output.suffix, "isolay");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, IsolayConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[settings]
widths = [1200, 1600]
custom_width = 500
quality = 65

[output]
suffix = "web"
keep_originals = true
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.settings.all_widths(), vec![500, 1200, 1600]);
        assert_eq!(config.settings.quality.value(), 65);
        assert_eq!(config.output.suffix, "web");
        assert!(config.output.keep_originals);
        assert_eq!(config.output.dir, PathBuf::from("optimized"));
    }

    #[test]
    fn load_config_file_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[settings\nformat =").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_default_is_sequential() {
        assert_eq!(effective_threads(&ProcessingConfig::default()), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_parallel_jobs: 99999,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_parallel_jobs: 0,
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("quality = 90").unwrap();
        let overlay: toml::Value = toml::from_str("quality = 70").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[settings]
format = "jpeg"
quality = 80
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[settings]
quality = 50
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let settings = merged.get("settings").unwrap();
        assert_eq!(settings.get("format").unwrap().as_str(), Some("jpeg"));
        assert_eq!(settings.get("quality").unwrap().as_integer(), Some(50));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("widths = [400, 800]").unwrap();
        let overlay: toml::Value = toml::from_str("widths = [1600]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("widths").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[settings]\nqualty = 70\n").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<IsolayConfig, _> = toml::from_str("[theme]\ncolor = \"red\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn quality_out_of_range_rejected() {
        for bad in ["0", "101"] {
            let overlay: toml::Value = toml::from_str(&format!("[settings]\nquality = {bad}")).unwrap();
            let result = resolve_config(stock_defaults_value().unwrap(), Some(overlay));
            assert!(matches!(result, Err(ConfigError::Validation(_))), "quality {bad}");
        }
    }

    #[test]
    fn quality_boundaries_accepted() {
        for ok in ["1", "100"] {
            let overlay: toml::Value = toml::from_str(&format!("[settings]\nquality = {ok}")).unwrap();
            assert!(resolve_config(stock_defaults_value().unwrap(), Some(overlay)).is_ok());
        }
    }

    #[test]
    fn zero_width_rejected() {
        let overlay: toml::Value = toml::from_str("[settings]\nwidths = [0, 400]").unwrap();
        let result = resolve_config(stock_defaults_value().unwrap(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_parallel_jobs_rejected() {
        let overlay: toml::Value = toml::from_str("[processing]\nmax_parallel_jobs = 0").unwrap();
        let result = resolve_config(stock_defaults_value().unwrap(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn suffix_with_separator_rejected() {
        let mut config = IsolayConfig::default();
        config.output.suffix = "a/b".into();
        assert!(config.validate().is_err());
        config.output.suffix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(IsolayConfig::default().validate().is_ok());
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: IsolayConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, IsolayConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[settings]"));
        assert!(content.contains("[output]"));
        assert!(content.contains("[processing]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("settings").is_some());
        assert!(val.get("output").is_some());
        assert!(val.get("processing").is_some());
    }
}
