//! Logo Compositor
//!
//! Places a logo onto a product background and encodes the result.
//!
//! # Algorithm
//!
//! 1. Decode the logo, substituting a placeholder glyph on failure
//! 2. Clamp the requested box to 40% of the canvas on each axis
//! 3. Fit the logo's native aspect ratio inside the clamped box
//! 4. Clamp the position so the box stays on the canvas
//! 5. Render the background at canvas size, overlay the logo with alpha,
//!    encode as PNG

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use super::logo::{LogoDecode, LogoSource};
use super::types::{
    CompositeError, CompositeResult, LogoPlacement, LogoStatus, Result, MAX_CANVAS_DIMENSION,
    MAX_LOGO_FRACTION,
};

/// Single compositor implementation over the `image` crate
pub struct Compositor;

impl Compositor {
    /// Composite `logo` onto encoded background bytes
    ///
    /// `canvas` defaults to the background's native size.
    pub fn composite(
        background: &[u8],
        logo: &LogoSource,
        placement: LogoPlacement,
        canvas: Option<(u32, u32)>,
    ) -> Result<CompositeResult> {
        let background = Self::decode_background(background)?;
        Self::composite_image(&background, logo, placement, canvas)
    }

    /// Composite onto a background image file
    pub fn composite_file(
        background_path: &Path,
        logo: &LogoSource,
        placement: LogoPlacement,
        canvas: Option<(u32, u32)>,
    ) -> Result<CompositeResult> {
        if !background_path.exists() {
            return Err(CompositeError::ImageLoad(format!(
                "background not found: {}",
                background_path.display()
            )));
        }
        let background = image::open(background_path).map_err(CompositeError::from_background)?;
        Self::composite_image(&background, logo, placement, canvas)
    }

    /// Decode background bytes, classifying failures as fatal load errors
    pub fn decode_background(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(CompositeError::ImageLoad("empty background".to_string()));
        }
        let background = image::load_from_memory(bytes).map_err(CompositeError::from_background)?;
        if background.width() == 0 || background.height() == 0 {
            return Err(CompositeError::ImageLoad(
                "background has zero dimensions".to_string(),
            ));
        }
        Ok(background)
    }

    /// Composite onto an already decoded background
    pub fn composite_image(
        background: &DynamicImage,
        logo: &LogoSource,
        placement: LogoPlacement,
        canvas: Option<(u32, u32)>,
    ) -> Result<CompositeResult> {
        let (canvas_width, canvas_height) =
            canvas.unwrap_or((background.width(), background.height()));
        if canvas_width == 0
            || canvas_height == 0
            || canvas_width > MAX_CANVAS_DIMENSION
            || canvas_height > MAX_CANVAS_DIMENSION
        {
            return Err(CompositeError::InvalidCanvas(canvas_width, canvas_height));
        }

        let decoded = logo.decode()?;
        let logo_status = match &decoded {
            LogoDecode::Decoded(_) => LogoStatus::Decoded,
            LogoDecode::Fallback { reason, .. } => {
                tracing::warn!(%reason, "logo could not be decoded, using placeholder");
                LogoStatus::Fallback {
                    reason: reason.to_string(),
                }
            }
        };

        let logo_image = decoded.image();
        let final_placement = Self::plan_placement(
            placement,
            logo_image.width(),
            logo_image.height(),
            canvas_width,
            canvas_height,
        );
        tracing::debug!(
            requested = ?placement,
            placement = ?final_placement,
            canvas_width,
            canvas_height,
            "planned logo placement"
        );

        let native = background.width() == canvas_width && background.height() == canvas_height;
        let mut canvas_image = if native {
            background.to_rgba8()
        } else {
            background
                .resize_exact(canvas_width, canvas_height, FilterType::Lanczos3)
                .to_rgba8()
        };

        let scaled = logo_image
            .resize_exact(
                final_placement.width,
                final_placement.height,
                FilterType::Lanczos3,
            )
            .to_rgba8();
        imageops::overlay(
            &mut canvas_image,
            &scaled,
            final_placement.x as i64,
            final_placement.y as i64,
        );

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(canvas_image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CompositeError::EncodeFailed(e.to_string()))?;

        Ok(CompositeResult {
            png,
            placement: final_placement,
            canvas_width,
            canvas_height,
            logo_status,
        })
    }

    /// Final logo rectangle for a request (steps 2-4, no pixels touched)
    pub fn plan_placement(
        requested: LogoPlacement,
        logo_width: u32,
        logo_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> LogoPlacement {
        let max_w = ((canvas_width as f64 * MAX_LOGO_FRACTION).floor() as u32).max(1);
        let max_h = ((canvas_height as f64 * MAX_LOGO_FRACTION).floor() as u32).max(1);
        let box_w = requested.width.clamp(1, max_w);
        let box_h = requested.height.clamp(1, max_h);

        let logo_aspect = logo_width.max(1) as f64 / logo_height.max(1) as f64;
        let box_aspect = box_w as f64 / box_h as f64;

        let (width, height) = if box_aspect > logo_aspect {
            // Box is proportionally wider: height binds
            let w = (box_h as f64 * logo_aspect).round() as u32;
            (w.clamp(1, box_w), box_h)
        } else {
            let h = (box_w as f64 / logo_aspect).round() as u32;
            (box_w, h.clamp(1, box_h))
        };

        let max_x = (canvas_width - width).min(i32::MAX as u32) as i32;
        let max_y = (canvas_height - height).min(i32::MAX as u32) as i32;

        LogoPlacement {
            x: requested.x.clamp(0, max_x),
            y: requested.y.clamp(0, max_y),
            width,
            height,
        }
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::types::FALLBACK_GLYPH_SIZE;
    use image::{Rgba, RgbaImage};

    fn png_of(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        png_of(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_plan_wide_logo_in_wide_box() {
        // 3:1 logo, 500x100 request on 400x400
        let placement =
            Compositor::plan_placement(LogoPlacement::new(50, 50, 500, 100), 300, 100, 400, 400);
        assert_eq!(placement.width, 160);
        assert_eq!(placement.height, 53);
        assert!(placement.fits_within(400, 400));
        assert!((placement.aspect_ratio() - 3.0).abs() / 3.0 < 0.01);
    }

    #[test]
    fn test_plan_constrains_by_height() {
        // Square logo, wide box: height binds
        let placement =
            Compositor::plan_placement(LogoPlacement::new(0, 0, 200, 100), 50, 50, 1000, 1000);
        assert_eq!((placement.width, placement.height), (100, 100));
    }

    #[test]
    fn test_plan_clamps_position() {
        let placement =
            Compositor::plan_placement(LogoPlacement::new(390, -20, 100, 100), 10, 10, 400, 300);
        assert_eq!(placement.x, 300);
        assert_eq!(placement.y, 0);
        assert!(placement.fits_within(400, 300));
    }

    #[test]
    fn test_plan_never_exceeds_forty_percent() {
        for (cw, ch) in [(400u32, 400u32), (1000, 250), (37, 91)] {
            for (lw, lh) in [(300u32, 100u32), (10, 90), (64, 64)] {
                let placement = Compositor::plan_placement(
                    LogoPlacement::new(-5, 9999, 5000, 5000),
                    lw,
                    lh,
                    cw,
                    ch,
                );
                assert!(placement.width as f64 <= cw as f64 * MAX_LOGO_FRACTION + 1e-9);
                assert!(placement.height as f64 <= ch as f64 * MAX_LOGO_FRACTION + 1e-9);
                assert!(placement.fits_within(cw, ch));
            }
        }
    }

    #[test]
    fn test_composite_draws_logo() {
        let background = solid_png(200, 100, [255, 255, 255, 255]);
        let logo = LogoSource::Bytes(solid_png(40, 20, [255, 0, 0, 255]));

        let result =
            Compositor::composite(&background, &logo, LogoPlacement::new(10, 10, 40, 20), None)
                .unwrap();

        assert_eq!(result.logo_status, LogoStatus::Decoded);
        assert_eq!((result.canvas_width, result.canvas_height), (200, 100));
        assert_eq!(result.placement, LogoPlacement::new(10, 10, 40, 20));

        let out = image::load_from_memory(&result.png).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (200, 100));
        let inside = out.get_pixel(30, 20);
        assert!(inside[0] > 245 && inside[1] < 10, "logo not drawn: {:?}", inside);
        assert_eq!(out.get_pixel(150, 80).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_composite_preserves_transparency() {
        let background = solid_png(100, 100, [0, 0, 255, 255]);
        let logo = LogoSource::Bytes(solid_png(20, 20, [255, 0, 0, 0]));

        let result =
            Compositor::composite(&background, &logo, LogoPlacement::new(10, 10, 20, 20), None)
                .unwrap();
        let out = image::load_from_memory(&result.png).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(15, 15).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_composite_custom_canvas() {
        let background = solid_png(50, 50, [200, 200, 200, 255]);
        let logo = LogoSource::Bytes(solid_png(10, 10, [0, 0, 0, 255]));

        let result = Compositor::composite(
            &background,
            &logo,
            LogoPlacement::new(0, 0, 30, 30),
            Some((120, 80)),
        )
        .unwrap();
        let out = image::load_from_memory(&result.png).unwrap();
        assert_eq!((out.width(), out.height()), (120, 80));
        assert_eq!(result.placement.width, 30);
    }

    #[test]
    fn test_bad_logo_uses_fallback() {
        let background = solid_png(300, 300, [255, 255, 255, 255]);
        let logo = LogoSource::Bytes(b"\x89PNG garbage".to_vec());

        let result =
            Compositor::composite(&background, &logo, LogoPlacement::new(0, 0, 64, 64), None)
                .unwrap();
        assert!(result.logo_status.is_fallback());
        assert_eq!(result.placement.width, FALLBACK_GLYPH_SIZE);
    }

    #[test]
    fn test_bad_background_is_fatal() {
        let logo = LogoSource::Bytes(solid_png(10, 10, [0, 0, 0, 255]));
        let result = Compositor::composite(b"nope", &logo, LogoPlacement::default(), None);
        assert!(matches!(
            result,
            Err(CompositeError::UnsupportedFormat(_)) | Err(CompositeError::ImageLoad(_))
        ));

        let result = Compositor::composite(&[], &logo, LogoPlacement::default(), None);
        assert!(matches!(result, Err(CompositeError::ImageLoad(_))));
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let background = solid_png(10, 10, [0, 0, 0, 255]);
        let logo = LogoSource::Bytes(solid_png(10, 10, [0, 0, 0, 255]));
        let result = Compositor::composite(
            &background,
            &logo,
            LogoPlacement::default(),
            Some((0, 10)),
        );
        assert!(matches!(result, Err(CompositeError::InvalidCanvas(0, 10))));
    }

    #[test]
    fn test_oversized_canvas_rejected() {
        let background = solid_png(10, 10, [0, 0, 0, 255]);
        let logo = LogoSource::Bytes(solid_png(10, 10, [0, 0, 0, 255]));
        let result = Compositor::composite(
            &background,
            &logo,
            LogoPlacement::default(),
            Some((3_000_000_000, 400)),
        );
        assert!(matches!(
            result,
            Err(CompositeError::InvalidCanvas(3_000_000_000, 400))
        ));
    }

    #[test]
    fn test_plan_handles_huge_canvas() {
        let placement = Compositor::plan_placement(
            LogoPlacement::new(10, 10, 100, 100),
            50,
            50,
            3_000_000_000,
            400,
        );
        assert_eq!(placement, LogoPlacement::new(10, 10, 100, 100));

        let placement = Compositor::plan_placement(
            LogoPlacement::new(i32::MAX, -1, 100, 100),
            50,
            50,
            u32::MAX,
            u32::MAX,
        );
        assert_eq!((placement.x, placement.y), (i32::MAX, 0));
    }

    #[test]
    fn test_missing_background_file() {
        let logo = LogoSource::Bytes(Vec::new());
        let result = Compositor::composite_file(
            Path::new("/nonexistent/bg.png"),
            &logo,
            LogoPlacement::default(),
            None,
        );
        assert!(matches!(result, Err(CompositeError::ImageLoad(_))));
    }
}
