//! Metrics Calculator
//!
//! Diagnostic geometry for a selected region. Nothing here gates validity.

use crate::detection::DetectedRegion;

use super::types::{CenterOffset, ConstraintMetrics, EdgeDistances};

/// Pure geometry over detected regions
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Metrics for the first (largest) of `regions`
    ///
    /// Every region passed in counts as a fragment of the selected area.
    /// An empty slice yields all-zero metrics.
    pub fn calculate(
        regions: &[DetectedRegion],
        image_width: u32,
        image_height: u32,
    ) -> ConstraintMetrics {
        let Some(selected) = regions.first() else {
            return ConstraintMetrics::default();
        };

        ConstraintMetrics {
            edge_distances: Self::edge_distances(selected, image_width, image_height),
            center_offset: Self::center_offset(selected, image_width, image_height),
            compactness: selected.fill_ratio(),
            fragment_count: regions.len(),
        }
    }

    /// Distance from each bounding-box edge to the matching image edge
    pub fn edge_distances(
        region: &DetectedRegion,
        image_width: u32,
        image_height: u32,
    ) -> EdgeDistances {
        let bbox = &region.bounding_box;
        EdgeDistances {
            top: bbox.y,
            right: image_width.saturating_sub(bbox.right()),
            bottom: image_height.saturating_sub(bbox.bottom()),
            left: bbox.x,
        }
    }

    /// Region centroid minus image center, in continuous coordinates
    ///
    /// Pixel `i` covers `[i, i + 1)`, so the centroid of pixel indices is
    /// shifted by half a pixel.
    pub fn center_offset(
        region: &DetectedRegion,
        image_width: u32,
        image_height: u32,
    ) -> CenterOffset {
        CenterOffset {
            x: region.centroid.x + 0.5 - image_width as f64 / 2.0,
            y: region.centroid.y + 0.5 - image_height as f64 / 2.0,
        }
    }
}

// ============================================================
// Tests
// ============================================================
