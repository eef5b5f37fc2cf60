//! Configuration file support
//!
//! Loads `config.toml` from the user config directory or an explicit path,
//! then layers command-line overrides on top.
//!
//! # Example config
//!
//! ```toml
//! placement_type = "chest"
//! threads = 4
//!
//! [detection]
//! preset = "wide"
//! tolerance = 15.0
//! min_area = 500
//!
//! [detection.noise_reduction]
//! enabled = true
//! kernel_size = 5
//! iterations = 2
//!
//! [constraints]
//! min_width = 80
//! min_height = 80
//! max_width = 300
//! max_height = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constraint::{ConstraintDimensions, ConstraintError, PlacementType};
use crate::detection::{DetectionConfig, DetectionSettings, SettingsError};

/// Directory name under the user config dir
const CONFIG_DIR_NAME: &str = "mockup-placement";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid detection settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid constraints: {0}")]
    Constraints(#[from] ConstraintError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// Config
// ============================================================

/// Complete tool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub constraints: ConstraintDimensions,
    pub placement_type: PlacementType,

    /// Worker threads (None = one per CPU)
    pub threads: Option<usize>,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply command-line overrides (CLI wins)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> Self {
        let mut merged = self.clone();
        let detection = &mut merged.detection;

        if let Some(preset) = &cli.preset {
            detection.preset = Some(preset.clone());
        }
        if cli.tolerance.is_some() {
            detection.tolerance = cli.tolerance;
        }
        if cli.min_area.is_some() {
            detection.min_area = cli.min_area;
        }
        if cli.max_area.is_some() {
            detection.max_area = cli.max_area;
        }

        let noise = &mut detection.noise_reduction;
        if let Some(enabled) = cli.noise_reduction {
            noise.enabled = enabled;
        }
        if let Some(kernel_size) = cli.kernel_size {
            noise.kernel_size = kernel_size;
        }
        if let Some(iterations) = cli.iterations {
            noise.iterations = iterations;
        }

        let edges = &mut detection.edge_smoothing;
        if let Some(enabled) = cli.edge_smoothing {
            edges.enabled = enabled;
        }
        if let Some(blur_radius) = cli.blur_radius {
            edges.blur_radius = blur_radius;
        }
        if let Some(threshold) = cli.threshold {
            edges.threshold = threshold;
        }

        let dims = &mut merged.constraints;
        if let Some(v) = cli.min_width {
            dims.min_width = v;
        }
        if let Some(v) = cli.min_height {
            dims.min_height = v;
        }
        if let Some(v) = cli.max_width {
            dims.max_width = v;
        }
        if let Some(v) = cli.max_height {
            dims.max_height = v;
        }

        if let Some(placement_type) = cli.placement_type {
            merged.placement_type = placement_type;
        }
        if cli.threads.is_some() {
            merged.threads = cli.threads;
        }

        merged
    }

    /// Validated detection settings
    pub fn detection_settings(&self) -> Result<DetectionSettings> {
        Ok(DetectionSettings::from_config(&self.detection)?)
    }

    /// Validated constraint dimensions
    pub fn constraint_dimensions(&self) -> Result<ConstraintDimensions> {
        self.constraints.validate()?;
        Ok(self.constraints)
    }

    /// Canonical JSON of the effective configuration
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================
// CLI Overrides
// ============================================================

/// Values set explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub preset: Option<String>,
    pub tolerance: Option<f32>,
    pub min_area: Option<u32>,
    pub max_area: Option<u32>,
    pub noise_reduction: Option<bool>,
    pub kernel_size: Option<u8>,
    pub iterations: Option<u8>,
    pub edge_smoothing: Option<bool>,
    pub blur_radius: Option<u8>,
    pub threshold: Option<u8>,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub placement_type: Option<PlacementType>,
    pub threads: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================
// Tests
// ============================================================
