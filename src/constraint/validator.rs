//! Constraint Validator
//!
//! Checks a detected region against the caller's size rules and derives the
//! usable placement rectangle.
//!
//! # Algorithm
//!
//! 1. Usable area: the largest rectangle centered on the region centroid
//!    that stays inside the bounding box and under the maximum size
//! 2. One warning per violated rule (size, centering, fragmentation,
//!    fill, aspect band, edge margin)
//! 3. Score = (1 - penalties) scaled by the region confidence
//!
//! A region below the minimum size is always reported as invalid, but its
//! shrunk usable area is still returned so callers can decide to proceed.

use crate::detection::{DetectedRegion, DetectionResult, RegionRect};

use super::metrics::MetricsCalculator;
use super::types::{ConstraintDimensions, PlacementType, ValidationResult, ValidationWarning};

// ============================================================
// Constants
// ============================================================

/// Score a result must exceed to be valid
pub const VALID_SCORE_THRESHOLD: f64 = 0.6;

/// Centroid offset (fraction of image dimension) beyond which a zone is off-center
const OFF_CENTER_THRESHOLD: f64 = 0.20;

/// Fill ratio below which a region counts as ragged
const LOW_FILL_THRESHOLD: f64 = 0.85;

/// Minimum margin to the image border (fraction of image dimension)
const NEAR_EDGE_FRACTION: f64 = 0.02;

const PENALTY_TOO_SMALL: f64 = 0.35;
const PENALTY_TOO_LARGE: f64 = 0.10;
const PENALTY_OFF_CENTER: f64 = 0.10;
const PENALTY_FRAGMENTED: f64 = 0.15;
const PENALTY_LOW_FILL: f64 = 0.15;
const PENALTY_ASPECT: f64 = 0.10;
const PENALTY_NEAR_EDGE: f64 = 0.05;

// ============================================================
// Constraint Validator
// ============================================================

/// Region-vs-rules validator
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Validate a single region
    pub fn validate(
        region: &DetectedRegion,
        dims: &ConstraintDimensions,
        image_width: u32,
        image_height: u32,
        placement_type: PlacementType,
    ) -> ValidationResult {
        Self::validate_with_fragments(region, 1, dims, image_width, image_height, placement_type)
    }

    /// Validate the largest region of a detection result
    pub fn validate_detection(
        result: &DetectionResult,
        dims: &ConstraintDimensions,
        placement_type: PlacementType,
    ) -> ValidationResult {
        let (width, height) = result.image_size;
        match result.primary_region() {
            Some(region) => Self::validate_with_fragments(
                region,
                result.regions.len(),
                dims,
                width,
                height,
                placement_type,
            ),
            None => Self::no_region(dims, placement_type),
        }
    }

    /// Validate a region that is one of `fragment_count` detected components
    pub fn validate_with_fragments(
        region: &DetectedRegion,
        fragment_count: usize,
        dims: &ConstraintDimensions,
        image_width: u32,
        image_height: u32,
        placement_type: PlacementType,
    ) -> ValidationResult {
        let usable_area = Self::usable_area(region, dims);
        let (usable_w, usable_h) = usable_area.map_or((0, 0), |r| (r.width, r.height));
        let bbox = &region.bounding_box;

        let mut warnings = Vec::new();
        let mut penalty = 0.0;
        let mut flag = |warning: ValidationWarning, cost: f64| {
            warnings.push(warning);
            penalty += cost;
        };

        let too_small = usable_w < dims.min_width || usable_h < dims.min_height;
        if too_small {
            flag(ValidationWarning::RegionTooSmall, PENALTY_TOO_SMALL);
        }
        if bbox.width > dims.max_width || bbox.height > dims.max_height {
            flag(ValidationWarning::RegionTooLarge, PENALTY_TOO_LARGE);
        }

        let offset = MetricsCalculator::center_offset(region, image_width, image_height);
        if offset.x.abs() > image_width as f64 * OFF_CENTER_THRESHOLD
            || offset.y.abs() > image_height as f64 * OFF_CENTER_THRESHOLD
        {
            flag(ValidationWarning::OffCenter, PENALTY_OFF_CENTER);
        }

        if fragment_count > 1 {
            flag(ValidationWarning::Fragmented, PENALTY_FRAGMENTED);
        }

        if region.fill_ratio() < LOW_FILL_THRESHOLD {
            flag(ValidationWarning::LowFillRatio, PENALTY_LOW_FILL);
        }

        let (aspect_lo, aspect_hi) = placement_type.aspect_band();
        if region.aspect_ratio < aspect_lo || region.aspect_ratio > aspect_hi {
            flag(ValidationWarning::AspectRatioMismatch, PENALTY_ASPECT);
        }

        let edges = MetricsCalculator::edge_distances(region, image_width, image_height);
        let margin_x = (image_width as f64 * NEAR_EDGE_FRACTION) as u32;
        let margin_y = (image_height as f64 * NEAR_EDGE_FRACTION) as u32;
        if edges.left < margin_x
            || edges.right < margin_x
            || edges.top < margin_y
            || edges.bottom < margin_y
        {
            flag(ValidationWarning::NearEdge, PENALTY_NEAR_EDGE);
        }

        let score = ((1.0 - penalty).max(0.0) * (0.5 + 0.5 * region.confidence)).clamp(0.0, 1.0);
        let is_valid = score > VALID_SCORE_THRESHOLD && usable_area.is_some() && !too_small;

        if !warnings.is_empty() {
            tracing::warn!(
                warnings = ?warnings.iter().map(|w| w.code()).collect::<Vec<_>>(),
                score,
                is_valid,
                "placement zone violates constraints"
            );
        }

        let recommendations = warnings
            .iter()
            .map(|w| w.recommendation(dims, placement_type))
            .collect();

        ValidationResult {
            is_valid,
            score,
            warnings,
            recommendations,
            usable_area,
        }
    }

    /// Largest rectangle centered on the centroid, inside the bounding box,
    /// no larger than the maximum size
    pub fn usable_area(region: &DetectedRegion, dims: &ConstraintDimensions) -> Option<RegionRect> {
        let bbox = &region.bounding_box;
        let (x, width) = Self::fit_axis(
            region.centroid.x + 0.5,
            bbox.x,
            bbox.right(),
            dims.max_width,
        );
        let (y, height) = Self::fit_axis(
            region.centroid.y + 0.5,
            bbox.y,
            bbox.bottom(),
            dims.max_height,
        );

        if width == 0 || height == 0 {
            return None;
        }
        Some(RegionRect::new(x, y, width, height))
    }

    /// Centered span on one axis: returns (start, length)
    fn fit_axis(center: f64, lo: u32, hi: u32, max_len: u32) -> (u32, u32) {
        let room = (center - lo as f64).min(hi as f64 - center).max(0.0);
        let len = ((2.0 * room).floor() as u32).min(max_len);
        let start = (center - len as f64 / 2.0).round().max(lo as f64) as u32;
        let start = start.min(hi.saturating_sub(len));
        (start, len)
    }

    fn no_region(dims: &ConstraintDimensions, placement_type: PlacementType) -> ValidationResult {
        let warning = ValidationWarning::NoRegion;
        ValidationResult {
            is_valid: false,
            score: 0.0,
            warnings: vec![warning],
            recommendations: vec![warning.recommendation(dims, placement_type)],
            usable_area: None,
        }
    }
}

// ============================================================
// Tests
// ============================================================
