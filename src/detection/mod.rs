//! Placement zone detection module
//!
//! Finds the marker-colored placement zone painted on a mockup template.
//!
//! # Pipeline
//!
//! template → [`ColorClassifier`] → raw mask → [`MorphologyFilter`] →
//! refined mask → [`RegionExtractor`] → [`DetectionResult`]
//!
//! Every call owns its buffers and takes its settings explicitly, so
//! independent detections can run on separate threads without locking.
//!
//! # Example
//!
//! ```rust,no_run
//! use mockup_placement::{detect, DetectionSettings, PixelBuffer};
//! use std::path::Path;
//!
//! let template = PixelBuffer::open(Path::new("tshirt_template.png")).unwrap();
//! let result = detect(&template, &DetectionSettings::default()).unwrap();
//!
//! if let Some(region) = result.primary_region() {
//!     println!("zone at {:?}", region.bounding_box);
//! }
//! ```

pub mod cancel;
pub mod color;
pub mod morphology;
pub mod region;
pub mod settings;
mod types;

use std::time::Instant;

pub use cancel::CancellationToken;
pub use color::{ClassificationMask, ColorClassifier};
pub use morphology::MorphologyFilter;
pub use region::{ExtractedRegions, RegionExtractor};
pub use settings::{
    ColorPreset, ColorRange, DetectionConfig, DetectionSettings, DetectionSettingsBuilder,
    EdgeSmoothing, NoiseReduction, SettingsError,
};
pub use types::{
    DetectedRegion, DetectionError, DetectionResult, DominantColor, PixelBuffer, Point,
    RegionRect, Result,
};

/// Detect placement zones in `image`
pub fn detect(image: &PixelBuffer, settings: &DetectionSettings) -> Result<DetectionResult> {
    detect_with_cancel(image, settings, &CancellationToken::none())
}

/// Detect placement zones, abandoning the scan once `cancel` fires
pub fn detect_with_cancel(
    image: &PixelBuffer,
    settings: &DetectionSettings,
    cancel: &CancellationToken,
) -> Result<DetectionResult> {
    let start = Instant::now();

    let classified = ColorClassifier::classify_with_cancel(
        image,
        settings.color_range(),
        settings.tolerance(),
        cancel,
    )?;
    tracing::debug!(
        target_pixels = classified.target_pixels,
        width = image.width(),
        height = image.height(),
        "classified template"
    );

    let refined = MorphologyFilter::apply_with_cancel(
        &classified.mask,
        settings.noise_reduction(),
        settings.edge_smoothing(),
        cancel,
    )?;
    let filtered_pixels = MorphologyFilter::area(&refined);
    tracing::debug!(
        before = classified.target_pixels,
        after = filtered_pixels,
        "refined mask"
    );

    let extracted = RegionExtractor::extract_with_cancel(
        &refined,
        settings.min_area(),
        settings.max_area(),
        cancel,
    )?;
    tracing::debug!(
        components = extracted.raw_component_count,
        kept = extracted.regions.len(),
        "extracted regions"
    );

    let regions = extracted.regions;
    let total_area: u64 = regions.iter().map(|r| r.pixel_count as u64).sum();
    let average_confidence = if regions.is_empty() {
        0.0
    } else {
        regions.iter().map(|r| r.confidence).sum::<f64>() / regions.len() as f64
    };

    Ok(DetectionResult {
        has_target_color: !regions.is_empty(),
        regions,
        total_area,
        average_confidence,
        processing_time: start.elapsed(),
        dominant_colors: ColorClassifier::dominant_colors(image),
        image_size: (image.width(), image.height()),
        raw_component_count: extracted.raw_component_count,
        classified_pixels: classified.target_pixels,
        filtered_pixels,
    })
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn template(width: u32, height: u32, zone: RegionRect) -> PixelBuffer {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([235, 235, 235, 255]));
        for y in zone.y..zone.bottom() {
            for x in zone.x..zone.right() {
                img.put_pixel(x, y, Rgba([0, 255, 0, 255]));
            }
        }
        PixelBuffer::from_rgba_image(img).unwrap()
    }

    #[test]
    fn test_detect_known_rectangle() {
        let zone = RegionRect::new(150, 125, 100, 50);
        let result = detect(&template(400, 400, zone), &DetectionSettings::default()).unwrap();

        assert!(result.has_target_color);
        assert_eq!(result.regions.len(), 1);
        let region = &result.regions[0];
        assert_eq!(region.bounding_box, zone);
        assert_eq!(region.pixel_count, 5000);
        assert!((region.percentage - 3.125).abs() < 0.01);
        assert_eq!(result.total_area, 5000);
        assert_eq!(result.classified_pixels, 5000);
        assert_eq!(result.filtered_pixels, 5000);
    }

    #[test]
    fn test_detect_no_target() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([200, 30, 30, 255]));
        let buffer = PixelBuffer::from_rgba_image(img).unwrap();
        let result = detect(&buffer, &DetectionSettings::default()).unwrap();

        assert!(!result.has_target_color);
        assert!(result.regions.is_empty());
        assert_eq!(result.total_area, 0);
        assert_eq!(result.average_confidence, 0.0);
        assert_eq!(result.dominant_colors.len(), 1);
    }

    #[test]
    fn test_detect_is_deterministic() {
        let buffer = template(120, 90, RegionRect::new(20, 30, 40, 25));
        let settings = DetectionSettings::default();
        let first = detect(&buffer, &settings).unwrap();
        let second = detect(&buffer, &settings).unwrap();
        assert!(first.same_detection(&second));
    }

    #[test]
    fn test_detect_cancelled() {
        let buffer = template(50, 50, RegionRect::new(5, 5, 20, 20));
        let token = CancellationToken::new();
        token.cancel();
        let result = detect_with_cancel(&buffer, &DetectionSettings::default(), &token);
        assert!(matches!(result, Err(DetectionError::Cancelled)));
    }
}
