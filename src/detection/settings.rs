//! Detection settings
//!
//! Strongly-typed configuration for one detection call. Settings are built
//! either through [`DetectionSettingsBuilder`] or merged from the loose,
//! serializable [`DetectionConfig`]; both paths validate every invariant
//! before a [`DetectionSettings`] value exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Strict preset: narrow window around pure green
const STRICT_HUE_MIN: f32 = 110.0;
const STRICT_HUE_MAX: f32 = 130.0;
const STRICT_SAT_MIN: f32 = 0.60;
const STRICT_VAL_MIN: f32 = 0.50;
const STRICT_TOLERANCE: f32 = 5.0;

/// Standard preset
const STANDARD_HUE_MIN: f32 = 100.0;
const STANDARD_HUE_MAX: f32 = 140.0;
const STANDARD_SAT_MIN: f32 = 0.40;
const STANDARD_VAL_MIN: f32 = 0.35;
const STANDARD_TOLERANCE: f32 = 10.0;

/// Wide preset for unevenly lit templates
const WIDE_HUE_MIN: f32 = 85.0;
const WIDE_HUE_MAX: f32 = 155.0;
const WIDE_SAT_MIN: f32 = 0.25;
const WIDE_VAL_MIN: f32 = 0.20;
const WIDE_TOLERANCE: f32 = 20.0;

/// Tolerance range (percent)
pub const MIN_TOLERANCE: f32 = 0.0;
pub const MAX_TOLERANCE: f32 = 30.0;

/// Morphology kernel size range (odd values only)
pub const MIN_KERNEL_SIZE: u8 = 3;
pub const MAX_KERNEL_SIZE: u8 = 9;

/// Opening iteration range
pub const MIN_ITERATIONS: u8 = 1;
pub const MAX_ITERATIONS: u8 = 3;

/// Gaussian blur radius range
pub const MIN_BLUR_RADIUS: u8 = 1;
pub const MAX_BLUR_RADIUS: u8 = 5;

/// Re-threshold intensity range
pub const MIN_SMOOTH_THRESHOLD: u8 = 64;
pub const MAX_SMOOTH_THRESHOLD: u8 = 192;

/// Default minimum region area in pixels
pub const DEFAULT_MIN_AREA: u32 = 100;

/// Default maximum region area in pixels
pub const DEFAULT_MAX_AREA: u32 = 50_000_000;

/// Preset names offered in suggestions
const PRESET_NAMES: [&str; 3] = ["strict", "standard", "wide"];

/// Minimum similarity for a "did you mean" suggestion
const SUGGESTION_SIMILARITY: f64 = 0.6;

// ============================================================
// Errors
// ============================================================

/// Invalid configuration, reported at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("tolerance must be within 0-30%, got {0}")]
    ToleranceOutOfRange(f32),

    #[error("min_area ({min}) must be less than max_area ({max})")]
    AreaOrder { min: u32, max: u32 },

    #[error("kernel size must be odd and within 3-9, got {0}")]
    InvalidKernelSize(u8),

    #[error("iterations must be within 1-3, got {0}")]
    InvalidIterations(u8),

    #[error("blur radius must be within 1-5, got {0}")]
    InvalidBlurRadius(u8),

    #[error("smoothing threshold must be within 64-192, got {0}")]
    InvalidThreshold(u8),

    #[error("invalid color range: {0}")]
    InvalidColorRange(String),

    #[error("unknown color preset '{name}'{}", suggestion_hint(.suggestion))]
    UnknownPreset {
        name: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

// ============================================================
// Color Range
// ============================================================

/// HSV window for the marker color
///
/// Hue is in degrees (0-360). A range with `hue_min > hue_max` wraps through
/// 0 degrees. Saturation and value are floors in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub hue_min: f32,
    pub hue_max: f32,
    pub sat_min: f32,
    pub val_min: f32,
    /// Tolerance suggested for this range (percent)
    pub tolerance: f32,
}

impl ColorRange {
    /// Arbitrary marker color range
    pub fn custom(
        hue_min: f32,
        hue_max: f32,
        sat_min: f32,
        val_min: f32,
    ) -> std::result::Result<Self, SettingsError> {
        let range = Self {
            hue_min,
            hue_max,
            sat_min,
            val_min,
            tolerance: STANDARD_TOLERANCE,
        };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> std::result::Result<(), SettingsError> {
        let hue_ok = |h: f32| (0.0..=360.0).contains(&h);
        let unit_ok = |v: f32| (0.0..=1.0).contains(&v);

        if !hue_ok(self.hue_min) || !hue_ok(self.hue_max) {
            return Err(SettingsError::InvalidColorRange(format!(
                "hue bounds {}-{} outside 0-360",
                self.hue_min, self.hue_max
            )));
        }
        if !unit_ok(self.sat_min) || !unit_ok(self.val_min) {
            return Err(SettingsError::InvalidColorRange(format!(
                "saturation/value floors {}/{} outside 0-1",
                self.sat_min, self.val_min
            )));
        }
        Ok(())
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        ColorPreset::Standard.range()
    }
}

/// Named marker color presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    Strict,
    #[default]
    Standard,
    Wide,
}

impl ColorPreset {
    /// All presets
    pub fn all() -> [ColorPreset; 3] {
        [ColorPreset::Strict, ColorPreset::Standard, ColorPreset::Wide]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorPreset::Strict => "strict",
            ColorPreset::Standard => "standard",
            ColorPreset::Wide => "wide",
        }
    }

    /// HSV range for this preset
    pub fn range(&self) -> ColorRange {
        match self {
            ColorPreset::Strict => ColorRange {
                hue_min: STRICT_HUE_MIN,
                hue_max: STRICT_HUE_MAX,
                sat_min: STRICT_SAT_MIN,
                val_min: STRICT_VAL_MIN,
                tolerance: STRICT_TOLERANCE,
            },
            ColorPreset::Standard => ColorRange {
                hue_min: STANDARD_HUE_MIN,
                hue_max: STANDARD_HUE_MAX,
                sat_min: STANDARD_SAT_MIN,
                val_min: STANDARD_VAL_MIN,
                tolerance: STANDARD_TOLERANCE,
            },
            ColorPreset::Wide => ColorRange {
                hue_min: WIDE_HUE_MIN,
                hue_max: WIDE_HUE_MAX,
                sat_min: WIDE_SAT_MIN,
                val_min: WIDE_VAL_MIN,
                tolerance: WIDE_TOLERANCE,
            },
        }
    }
}

impl fmt::Display for ColorPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorPreset {
    type Err = SettingsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "strict" => Ok(ColorPreset::Strict),
            "standard" => Ok(ColorPreset::Standard),
            "wide" => Ok(ColorPreset::Wide),
            _ => {
                let suggestion = PRESET_NAMES
                    .iter()
                    .map(|name| (*name, strsim::jaro_winkler(&normalized, name)))
                    .filter(|(_, score)| *score >= SUGGESTION_SIMILARITY)
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(name, _)| name.to_string());
                Err(SettingsError::UnknownPreset {
                    name: s.to_string(),
                    suggestion,
                })
            }
        }
    }
}

// ============================================================
// Morphology Settings
// ============================================================

/// Opening (erode then dilate) parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseReduction {
    pub enabled: bool,
    /// Side of the square kernel (odd, 3-9)
    pub kernel_size: u8,
    /// Erosion/dilation passes (1-3)
    pub iterations: u8,
}

impl Default for NoiseReduction {
    fn default() -> Self {
        Self {
            enabled: true,
            kernel_size: 3,
            iterations: 1,
        }
    }
}

/// Blur + re-threshold parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSmoothing {
    pub enabled: bool,
    /// Gaussian radius (1-5)
    pub blur_radius: u8,
    /// Re-threshold intensity (64-192)
    pub threshold: u8,
}

impl Default for EdgeSmoothing {
    fn default() -> Self {
        Self {
            enabled: false,
            blur_radius: 2,
            threshold: 128,
        }
    }
}

// ============================================================
// Detection Settings
// ============================================================

/// Validated settings for one detection call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSettings {
    color_range: ColorRange,
    tolerance: f32,
    min_area: u32,
    max_area: u32,
    noise_reduction: NoiseReduction,
    edge_smoothing: EdgeSmoothing,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        let color_range = ColorRange::default();
        Self {
            color_range,
            tolerance: color_range.tolerance,
            min_area: DEFAULT_MIN_AREA,
            max_area: DEFAULT_MAX_AREA,
            noise_reduction: NoiseReduction::default(),
            edge_smoothing: EdgeSmoothing::default(),
        }
    }
}

impl DetectionSettings {
    /// Create a builder starting from defaults
    pub fn builder() -> DetectionSettingsBuilder {
        DetectionSettingsBuilder::default()
    }

    /// Defaults for a named preset
    pub fn with_preset(preset: ColorPreset) -> Self {
        let color_range = preset.range();
        Self {
            color_range,
            tolerance: color_range.tolerance,
            ..Default::default()
        }
    }

    /// Merge a loose config over the defaults and validate the result
    pub fn from_config(config: &DetectionConfig) -> std::result::Result<Self, SettingsError> {
        let preset = match config.preset.as_deref() {
            Some(name) => name.parse::<ColorPreset>()?,
            None => ColorPreset::default(),
        };

        let mut builder = Self::builder().preset(preset);
        if let Some(range) = config.color_range {
            builder = builder.color_range(range);
        }
        if let Some(tolerance) = config.tolerance {
            builder = builder.tolerance(tolerance);
        }
        if let Some(min_area) = config.min_area {
            builder = builder.min_area(min_area);
        }
        if let Some(max_area) = config.max_area {
            builder = builder.max_area(max_area);
        }

        builder
            .noise_reduction(config.noise_reduction)
            .edge_smoothing(config.edge_smoothing)
            .build()
    }

    pub fn color_range(&self) -> &ColorRange {
        &self.color_range
    }

    /// Effective tolerance (percent)
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn min_area(&self) -> u32 {
        self.min_area
    }

    pub fn max_area(&self) -> u32 {
        self.max_area
    }

    pub fn noise_reduction(&self) -> &NoiseReduction {
        &self.noise_reduction
    }

    pub fn edge_smoothing(&self) -> &EdgeSmoothing {
        &self.edge_smoothing
    }

    /// Canonical JSON form used in cache keys
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn validate(&self) -> std::result::Result<(), SettingsError> {
        self.color_range.validate()?;

        if !(MIN_TOLERANCE..=MAX_TOLERANCE).contains(&self.tolerance) {
            return Err(SettingsError::ToleranceOutOfRange(self.tolerance));
        }
        if self.min_area >= self.max_area {
            return Err(SettingsError::AreaOrder {
                min: self.min_area,
                max: self.max_area,
            });
        }

        let nr = &self.noise_reduction;
        if nr.kernel_size % 2 == 0 || !(MIN_KERNEL_SIZE..=MAX_KERNEL_SIZE).contains(&nr.kernel_size)
        {
            return Err(SettingsError::InvalidKernelSize(nr.kernel_size));
        }
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&nr.iterations) {
            return Err(SettingsError::InvalidIterations(nr.iterations));
        }

        let es = &self.edge_smoothing;
        if !(MIN_BLUR_RADIUS..=MAX_BLUR_RADIUS).contains(&es.blur_radius) {
            return Err(SettingsError::InvalidBlurRadius(es.blur_radius));
        }
        if !(MIN_SMOOTH_THRESHOLD..=MAX_SMOOTH_THRESHOLD).contains(&es.threshold) {
            return Err(SettingsError::InvalidThreshold(es.threshold));
        }

        Ok(())
    }
}

/// Builder for DetectionSettings
#[derive(Debug, Default)]
pub struct DetectionSettingsBuilder {
    settings: DetectionSettings,
}

impl DetectionSettingsBuilder {
    /// Use a preset color range and its tolerance
    #[must_use]
    pub fn preset(mut self, preset: ColorPreset) -> Self {
        let range = preset.range();
        self.settings.color_range = range;
        self.settings.tolerance = range.tolerance;
        self
    }

    /// Use a custom color range (keeps the current tolerance)
    #[must_use]
    pub fn color_range(mut self, range: ColorRange) -> Self {
        self.settings.color_range = range;
        self
    }

    /// Set tolerance percent
    #[must_use]
    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.settings.tolerance = tolerance;
        self
    }

    /// Set minimum region area in pixels
    #[must_use]
    pub fn min_area(mut self, area: u32) -> Self {
        self.settings.min_area = area;
        self
    }

    /// Set maximum region area in pixels
    #[must_use]
    pub fn max_area(mut self, area: u32) -> Self {
        self.settings.max_area = area;
        self
    }

    /// Set noise reduction parameters
    #[must_use]
    pub fn noise_reduction(mut self, noise_reduction: NoiseReduction) -> Self {
        self.settings.noise_reduction = noise_reduction;
        self
    }

    /// Set edge smoothing parameters
    #[must_use]
    pub fn edge_smoothing(mut self, edge_smoothing: EdgeSmoothing) -> Self {
        self.settings.edge_smoothing = edge_smoothing;
        self
    }

    /// Validate and build the settings
    pub fn build(self) -> std::result::Result<DetectionSettings, SettingsError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

// ============================================================
// Loose Config Surface
// ============================================================

/// Serializable detection configuration (config files, CLI)
///
/// Every field is optional; [`DetectionSettings::from_config`] fills the gaps
/// with defaults and validates the merged result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Preset name: strict, standard or wide
    pub preset: Option<String>,

    /// Custom range overriding the preset bounds
    pub color_range: Option<ColorRange>,

    pub tolerance: Option<f32>,
    pub min_area: Option<u32>,
    pub max_area: Option<u32>,
    pub noise_reduction: NoiseReduction,
    pub edge_smoothing: EdgeSmoothing,
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = DetectionSettings::builder().build().unwrap();
        assert_eq!(settings, DetectionSettings::default());
        assert_eq!(settings.tolerance(), STANDARD_TOLERANCE);
        assert!(settings.noise_reduction().enabled);
        assert!(!settings.edge_smoothing().enabled);
    }

    #[test]
    fn test_builder() {
        let settings = DetectionSettings::builder()
            .preset(ColorPreset::Wide)
            .tolerance(25.0)
            .min_area(10)
            .max_area(1000)
            .noise_reduction(NoiseReduction {
                enabled: true,
                kernel_size: 5,
                iterations: 2,
            })
            .build()
            .unwrap();

        assert_eq!(settings.color_range().hue_min, WIDE_HUE_MIN);
        assert_eq!(settings.tolerance(), 25.0);
        assert_eq!(settings.min_area(), 10);
        assert_eq!(settings.max_area(), 1000);
        assert_eq!(settings.noise_reduction().kernel_size, 5);
    }

    #[test]
    fn test_area_order_rejected() {
        let result = DetectionSettings::builder().min_area(500).max_area(500).build();
        assert_eq!(result, Err(SettingsError::AreaOrder { min: 500, max: 500 }));
    }

    #[test]
    fn test_even_kernel_rejected() {
        let result = DetectionSettings::builder()
            .noise_reduction(NoiseReduction {
                enabled: true,
                kernel_size: 4,
                iterations: 1,
            })
            .build();
        assert_eq!(result, Err(SettingsError::InvalidKernelSize(4)));
    }

    #[test]
    fn test_kernel_out_of_range_rejected() {
        for size in [1u8, 11] {
            let result = DetectionSettings::builder()
                .noise_reduction(NoiseReduction {
                    enabled: true,
                    kernel_size: size,
                    iterations: 1,
                })
                .build();
            assert_eq!(result, Err(SettingsError::InvalidKernelSize(size)));
        }
    }

    #[test]
    fn test_disabled_stages_still_validated() {
        let result = DetectionSettings::builder()
            .edge_smoothing(EdgeSmoothing {
                enabled: false,
                blur_radius: 9,
                threshold: 128,
            })
            .build();
        assert_eq!(result, Err(SettingsError::InvalidBlurRadius(9)));
    }

    #[test]
    fn test_tolerance_and_threshold_bounds() {
        assert_eq!(
            DetectionSettings::builder().tolerance(31.0).build(),
            Err(SettingsError::ToleranceOutOfRange(31.0))
        );
        assert_eq!(
            DetectionSettings::builder()
                .edge_smoothing(EdgeSmoothing {
                    enabled: true,
                    blur_radius: 2,
                    threshold: 200,
                })
                .build(),
            Err(SettingsError::InvalidThreshold(200))
        );
        assert_eq!(
            DetectionSettings::builder()
                .noise_reduction(NoiseReduction {
                    enabled: true,
                    kernel_size: 3,
                    iterations: 0,
                })
                .build(),
            Err(SettingsError::InvalidIterations(0))
        );
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("strict".parse::<ColorPreset>().unwrap(), ColorPreset::Strict);
        assert_eq!(" WIDE ".parse::<ColorPreset>().unwrap(), ColorPreset::Wide);

        match "standrd".parse::<ColorPreset>() {
            Err(SettingsError::UnknownPreset { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("standard"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        match "zzz".parse::<ColorPreset>() {
            Err(SettingsError::UnknownPreset { suggestion, .. }) => assert!(suggestion.is_none()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_preset_message() {
        let err = "strickt".parse::<ColorPreset>().unwrap_err();
        assert!(err.to_string().contains("did you mean 'strict'"));
    }

    #[test]
    fn test_from_config_merges_defaults() {
        let config = DetectionConfig {
            preset: Some("strict".to_string()),
            min_area: Some(42),
            ..Default::default()
        };
        let settings = DetectionSettings::from_config(&config).unwrap();
        assert_eq!(settings.color_range(), &ColorPreset::Strict.range());
        assert_eq!(settings.tolerance(), STRICT_TOLERANCE);
        assert_eq!(settings.min_area(), 42);
        assert_eq!(settings.max_area(), DEFAULT_MAX_AREA);
    }

    #[test]
    fn test_from_config_fails_fast() {
        let config = DetectionConfig {
            min_area: Some(10),
            max_area: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            DetectionSettings::from_config(&config),
            Err(SettingsError::AreaOrder { .. })
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config: DetectionConfig = toml::from_str(
            r#"
            preset = "wide"
            tolerance = 15.0

            [noise_reduction]
            kernel_size = 5
            "#,
        )
        .unwrap();
        let settings = DetectionSettings::from_config(&config).unwrap();
        assert_eq!(settings.tolerance(), 15.0);
        assert_eq!(settings.noise_reduction().kernel_size, 5);
        assert_eq!(settings.noise_reduction().iterations, 1);
        assert!(settings.noise_reduction().enabled);
    }

    #[test]
    fn test_custom_range_validation() {
        assert!(ColorRange::custom(300.0, 20.0, 0.3, 0.3).is_ok());
        assert!(ColorRange::custom(10.0, 400.0, 0.3, 0.3).is_err());
        assert!(ColorRange::custom(10.0, 40.0, 1.3, 0.3).is_err());
    }
}
