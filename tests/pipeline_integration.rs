//! Pipeline integration tests
//!
//! End-to-end checks over synthetic templates: detection, validation,
//! metrics and compositing through the public API.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use mockup_placement::{
    detect, ColorPreset, Compositor, ConstraintDimensions, ConstraintValidator, DetectionSettings,
    LogoPlacement, LogoSource, MetricsCalculator, MockupPipeline, PipelineCache, PixelBuffer,
    PlacementSource, PlacementType, RegionRect, ValidationWarning,
};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

const MARKER: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BACKGROUND: Rgba<u8> = Rgba([235, 235, 235, 255]);

fn canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, BACKGROUND)
}

fn paint(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, color);
        }
    }
}

fn encode(img: RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn scenario_a() -> RgbaImage {
    let mut img = canvas(400, 400);
    paint(&mut img, 150, 125, 100, 50, MARKER);
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    // TC-PIPE-001: Scenario A, single solid rectangle
    #[test]
    fn test_scenario_a_detection() {
        let image = PixelBuffer::from_rgba_image(scenario_a()).unwrap();
        let result = detect(&image, &DetectionSettings::default()).unwrap();

        assert!(result.has_target_color);
        assert_eq!(result.regions.len(), 1);

        let region = &result.regions[0];
        assert!((4750..=5250).contains(&region.pixel_count));
        assert_eq!(region.bounding_box, RegionRect::new(150, 125, 100, 50));
        assert!((region.percentage - 3.125).abs() < 0.1);
        assert!((region.aspect_ratio - 2.0).abs() < 1e-9);
    }

    // TC-PIPE-002: Scenario A, validation and metrics
    #[test]
    fn test_scenario_a_validation_and_metrics() {
        let image = PixelBuffer::from_rgba_image(scenario_a()).unwrap();
        let result = detect(&image, &DetectionSettings::default()).unwrap();
        let region = result.primary_region().unwrap();

        let validation = ConstraintValidator::validate(
            region,
            &ConstraintDimensions::default(),
            400,
            400,
            PlacementType::Banner,
        );
        assert_eq!(validation.usable_area, Some(RegionRect::new(150, 125, 100, 50)));
        assert!(!validation.has_warning(ValidationWarning::RegionTooSmall));
        assert_eq!(validation.warnings.len(), validation.recommendations.len());

        let metrics = MetricsCalculator::calculate(&result.regions, 400, 400);
        assert_eq!(metrics.edge_distances.left, 150);
        assert_eq!(metrics.edge_distances.right, 150);
        assert_eq!(metrics.edge_distances.top, 125);
        assert_eq!(metrics.edge_distances.bottom, 225);
        assert!(metrics.center_offset.x.abs() < 1e-9);
        assert!((metrics.center_offset.y + 50.0).abs() < 1e-9);
        assert!((metrics.compactness - 1.0).abs() < 1e-9);
        assert_eq!(metrics.fragment_count, 1);
    }

    // TC-PIPE-003: Scenario B, wide logo in an oversized box
    #[test]
    fn test_scenario_b_compositing() {
        let background = encode(canvas(400, 400));
        let logo_image = RgbaImage::from_pixel(300, 100, Rgba([20, 20, 160, 255]));
        let logo = LogoSource::Bytes(encode(logo_image));

        let result = Compositor::composite(
            &background,
            &logo,
            LogoPlacement::new(50, 50, 500, 100),
            Some((400, 400)),
        )
        .unwrap();

        let placement = result.placement;
        assert!(placement.width <= 160 && placement.height <= 160);
        assert_eq!((placement.width, placement.height), (160, 53));
        assert!((placement.aspect_ratio() - 3.0).abs() / 3.0 < 0.01);
        assert!(placement.fits_within(400, 400));

        let out = image::load_from_memory(&result.png).unwrap().to_rgba8();
        let center = out.get_pixel(
            placement.x as u32 + placement.width / 2,
            placement.y as u32 + placement.height / 2,
        );
        assert!(center[2] > 140 && center[0] < 40, "logo not drawn: {:?}", center);
    }

    // TC-PIPE-004: No target color
    #[test]
    fn test_no_target_color() {
        let image = PixelBuffer::from_rgba_image(canvas(120, 80)).unwrap();
        let result = detect(&image, &DetectionSettings::default()).unwrap();

        assert!(result.regions.is_empty());
        assert!(!result.has_target_color);
        assert_eq!(result.total_area, 0);
        assert_eq!(result.classified_pixels, 0);
    }

    // TC-PIPE-005: Determinism
    #[test]
    fn test_detection_is_deterministic() {
        let mut img = scenario_a();
        paint(&mut img, 20, 300, 40, 40, MARKER);
        let image = PixelBuffer::from_rgba_image(img).unwrap();
        let settings = DetectionSettings::builder()
            .preset(ColorPreset::Wide)
            .build()
            .unwrap();

        let first = detect(&image, &settings).unwrap();
        for _ in 0..3 {
            let again = detect(&image, &settings).unwrap();
            assert!(first.same_detection(&again));
        }
    }

    // TC-PIPE-006: Noise reduction never grows the mask
    #[test]
    fn test_noise_reduction_is_monotonic() {
        let mut img = canvas(200, 200);
        paint(&mut img, 20, 20, 60, 60, MARKER);
        for y in (120..200).step_by(10) {
            for x in (120..200).step_by(10) {
                img.put_pixel(x, y, MARKER);
            }
        }
        let image = PixelBuffer::from_rgba_image(img).unwrap();

        let raw_settings = DetectionSettings::builder()
            .noise_reduction(mockup_placement::detection::NoiseReduction {
                enabled: false,
                ..Default::default()
            })
            .build()
            .unwrap();
        let raw = detect(&image, &raw_settings).unwrap();
        let filtered = detect(&image, &DetectionSettings::default()).unwrap();

        assert_eq!(raw.filtered_pixels, raw.classified_pixels);
        assert!(filtered.filtered_pixels <= filtered.classified_pixels);
        assert!(filtered.filtered_pixels < raw.filtered_pixels);
        assert!(raw.raw_component_count > filtered.raw_component_count);

        // Specks fall under min_area either way
        assert_eq!(raw.regions.len(), 1);
        assert_eq!(filtered.regions.len(), 1);
        assert_eq!(filtered.regions[0].pixel_count, 3600);
    }

    // TC-PIPE-007: Too-small zone is reported, not dropped
    #[test]
    fn test_small_zone_is_invalid_with_usable_area() {
        let mut img = canvas(300, 300);
        paint(&mut img, 130, 130, 30, 30, MARKER);

        let pipeline = MockupPipeline::default();
        let analysis = pipeline.analyze(&encode(img)).unwrap();

        assert!(analysis.validation.has_warning(ValidationWarning::RegionTooSmall));
        assert!(!analysis.validation.is_valid);
        assert_eq!(
            analysis.validation.usable_area,
            Some(RegionRect::new(130, 130, 30, 30))
        );
    }

    // TC-PIPE-008: Fragmented zone
    #[test]
    fn test_fragmented_zone() {
        let mut img = canvas(400, 400);
        paint(&mut img, 100, 150, 80, 80, MARKER);
        paint(&mut img, 220, 150, 60, 60, MARKER);

        let analysis = MockupPipeline::default().analyze(&encode(img)).unwrap();
        assert_eq!(analysis.detection.regions.len(), 2);
        assert_eq!(analysis.detection.regions[0].pixel_count, 6400);
        assert!(analysis.validation.has_warning(ValidationWarning::Fragmented));
        assert_eq!(analysis.metrics.fragment_count, 2);
    }

    // TC-PIPE-009: Bad logo degrades to placeholder
    #[test]
    fn test_pipeline_logo_fallback() {
        let template = encode(scenario_a());
        let logo = LogoSource::detect(b"data:image/png;base64,AAAA".to_vec());

        let outcome = MockupPipeline::default()
            .run(&template, &logo, None, None)
            .unwrap();

        assert_eq!(outcome.placement_source, PlacementSource::Detected);
        assert!(outcome.composite.logo_status.is_fallback());
        assert!(outcome.composite.placement.fits_within(400, 400));
    }

    // TC-PIPE-010: Unreadable background is fatal
    #[test]
    fn test_unreadable_background_fails() {
        let logo = LogoSource::Bytes(encode(canvas(10, 10)));
        let result =
            Compositor::composite(b"\x00\x01garbage", &logo, LogoPlacement::default(), None);
        assert!(result.is_err());
    }

    // TC-PIPE-011: Concurrent identical requests collapse onto one detection
    #[test]
    fn test_concurrent_cached_runs() {
        let cache = Arc::new(PipelineCache::new());
        let pipeline = MockupPipeline::default().with_cache(Arc::clone(&cache));
        let template = Arc::new(encode(scenario_a()));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pipeline = pipeline.clone();
                let template = Arc::clone(&template);
                thread::spawn(move || pipeline.analyze(&template).unwrap())
            })
            .collect();
        let analyses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.detections.stats().misses, 1);
        assert_eq!(cache.detections.stats().hits, 5);
        assert!(analyses
            .iter()
            .all(|a| Arc::ptr_eq(&a.detection, &analyses[0].detection)));
    }

    // TC-PIPE-012: Concurrent detections with different settings do not interfere
    #[test]
    fn test_concurrent_settings_isolation() {
        let mut img = canvas(200, 200);
        paint(&mut img, 50, 50, 100, 100, Rgba([143, 204, 143, 255]));
        let image = Arc::new(PixelBuffer::from_rgba_image(img).unwrap());

        let handles: Vec<_> = [ColorPreset::Strict, ColorPreset::Wide]
            .into_iter()
            .cycle()
            .take(8)
            .map(|preset| {
                let image = Arc::clone(&image);
                thread::spawn(move || {
                    let result = detect(&image, &DetectionSettings::with_preset(preset)).unwrap();
                    (preset, result.regions.len())
                })
            })
            .collect();

        for handle in handles {
            let (preset, count) = handle.join().unwrap();
            match preset {
                ColorPreset::Strict => assert_eq!(count, 0),
                _ => assert_eq!(count, 1),
            }
        }
    }
}
