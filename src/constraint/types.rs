//! Common types for the constraint module

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::composite::LogoPlacement;
use crate::detection::RegionRect;

// ============================================================
// Constants
// ============================================================

/// Default minimum logo width in pixels
pub const DEFAULT_MIN_WIDTH: u32 = 50;

/// Default minimum logo height in pixels
pub const DEFAULT_MIN_HEIGHT: u32 = 50;

/// Default maximum logo width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 400;

/// Default maximum logo height in pixels
pub const DEFAULT_MAX_HEIGHT: u32 = 400;

/// Default logo position when no zone is detected
pub const DEFAULT_X: u32 = 100;
pub const DEFAULT_Y: u32 = 100;

// ============================================================
// Error Types
// ============================================================

/// Constraint error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("Invalid constraint dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Unknown placement type: {0}")]
    UnknownPlacementType(String),
}

pub type Result<T> = std::result::Result<T, ConstraintError>;

// ============================================================
// Constraint Dimensions
// ============================================================

/// Caller-supplied size rules for the logo placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintDimensions {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub default_x: u32,
    pub default_y: u32,
}

impl Default for ConstraintDimensions {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            default_x: DEFAULT_X,
            default_y: DEFAULT_Y,
        }
    }
}

impl ConstraintDimensions {
    /// Create validated dimensions
    pub fn new(
        min_width: u32,
        min_height: u32,
        max_width: u32,
        max_height: u32,
        default_x: u32,
        default_y: u32,
    ) -> Result<Self> {
        let dims = Self {
            min_width,
            min_height,
            max_width,
            max_height,
            default_x,
            default_y,
        };
        dims.validate()?;
        Ok(dims)
    }

    /// Check min <= max on both axes and non-zero maxima
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConstraintError::InvalidDimensions(
                "maximum size must be non-zero".to_string(),
            ));
        }
        if self.min_width > self.max_width {
            return Err(ConstraintError::InvalidDimensions(format!(
                "min_width {} exceeds max_width {}",
                self.min_width, self.max_width
            )));
        }
        if self.min_height > self.max_height {
            return Err(ConstraintError::InvalidDimensions(format!(
                "min_height {} exceeds max_height {}",
                self.min_height, self.max_height
            )));
        }
        Ok(())
    }

    /// Placement used when no zone is available
    pub fn fallback_placement(&self) -> LogoPlacement {
        LogoPlacement {
            x: self.default_x as i32,
            y: self.default_y as i32,
            width: self.min_width.max(1),
            height: self.min_height.max(1),
        }
    }
}

// ============================================================
// Placement Type
// ============================================================

/// Where on the product the logo goes; selects the expected aspect band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementType {
    Chest,
    FullFront,
    Back,
    Sleeve,
    Badge,
    Banner,
    #[default]
    Generic,
}

impl PlacementType {
    pub fn all() -> [PlacementType; 7] {
        [
            PlacementType::Chest,
            PlacementType::FullFront,
            PlacementType::Back,
            PlacementType::Sleeve,
            PlacementType::Badge,
            PlacementType::Banner,
            PlacementType::Generic,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlacementType::Chest => "chest",
            PlacementType::FullFront => "full_front",
            PlacementType::Back => "back",
            PlacementType::Sleeve => "sleeve",
            PlacementType::Badge => "badge",
            PlacementType::Banner => "banner",
            PlacementType::Generic => "generic",
        }
    }

    /// Expected width/height band (inclusive)
    pub fn aspect_band(&self) -> (f64, f64) {
        match self {
            PlacementType::Chest => (0.6, 2.0),
            PlacementType::FullFront => (0.5, 1.5),
            PlacementType::Back => (0.5, 1.5),
            PlacementType::Sleeve => (0.25, 1.0),
            PlacementType::Badge => (0.75, 1.33),
            PlacementType::Banner => (2.0, 8.0),
            PlacementType::Generic => (0.2, 5.0),
        }
    }
}

impl fmt::Display for PlacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlacementType {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        PlacementType::all()
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| ConstraintError::UnknownPlacementType(s.to_string()))
    }
}

// ============================================================
// Validation Output
// ============================================================

/// Soft constraint violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationWarning {
    NoRegion,
    RegionTooSmall,
    RegionTooLarge,
    OffCenter,
    Fragmented,
    LowFillRatio,
    AspectRatioMismatch,
    NearEdge,
}

impl ValidationWarning {
    /// Stable textual code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationWarning::NoRegion => "no_region",
            ValidationWarning::RegionTooSmall => "region_too_small",
            ValidationWarning::RegionTooLarge => "region_too_large",
            ValidationWarning::OffCenter => "off_center",
            ValidationWarning::Fragmented => "fragmented",
            ValidationWarning::LowFillRatio => "low_fill_ratio",
            ValidationWarning::AspectRatioMismatch => "aspect_ratio_mismatch",
            ValidationWarning::NearEdge => "near_edge",
        }
    }

    /// Recommendation paired with this warning
    pub fn recommendation(
        &self,
        dims: &ConstraintDimensions,
        placement_type: PlacementType,
    ) -> String {
        match self {
            ValidationWarning::NoRegion => {
                "Paint the placement zone with the marker color or widen the color preset"
                    .to_string()
            }
            ValidationWarning::RegionTooSmall => format!(
                "Enlarge the marked zone to at least {}x{} px or lower the minimum size",
                dims.min_width, dims.min_height
            ),
            ValidationWarning::RegionTooLarge => format!(
                "The logo will be limited to {}x{} px; shrink the zone or raise the maximum size",
                dims.max_width, dims.max_height
            ),
            ValidationWarning::OffCenter => {
                "Move the zone closer to the product center or confirm the offset is intended"
                    .to_string()
            }
            ValidationWarning::Fragmented => {
                "Merge the marked areas into one solid zone; only the largest part is used"
                    .to_string()
            }
            ValidationWarning::LowFillRatio => {
                "Fill the zone completely; gaps or anti-aliased edges reduce the usable area"
                    .to_string()
            }
            ValidationWarning::AspectRatioMismatch => {
                let (lo, hi) = placement_type.aspect_band();
                format!(
                    "Zone proportions are unusual for a {} placement (expected {:.2}-{:.2})",
                    placement_type, lo, hi
                )
            }
            ValidationWarning::NearEdge => {
                "Keep a margin between the zone and the template border".to_string()
            }
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of validating a region against the size rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,

    /// Quality score (0.0-1.0)
    pub score: f64,

    pub warnings: Vec<ValidationWarning>,

    /// One recommendation per warning, same order
    pub recommendations: Vec<String>,

    /// Largest rule-conforming rectangle centered on the region centroid
    pub usable_area: Option<RegionRect>,
}

impl ValidationResult {
    pub fn has_warning(&self, warning: ValidationWarning) -> bool {
        self.warnings.contains(&warning)
    }

    /// Warning codes as strings
    pub fn warning_codes(&self) -> Vec<&'static str> {
        self.warnings.iter().map(|w| w.code()).collect()
    }
}

// ============================================================
// Metrics Output
// ============================================================

/// Distance in pixels from each bounding-box edge to the image edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeDistances {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl EdgeDistances {
    pub fn min(&self) -> u32 {
        self.top.min(self.right).min(self.bottom).min(self.left)
    }
}

/// Region centroid minus image center
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CenterOffset {
    pub x: f64,
    pub y: f64,
}

/// Secondary geometric statistics for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstraintMetrics {
    pub edge_distances: EdgeDistances,
    pub center_offset: CenterOffset,
    /// Fill ratio of the selected region (0.0-1.0)
    pub compactness: f64,
    /// Components contributing to the selected area
    pub fragment_count: usize,
}

// ============================================================
// Tests
// ============================================================
