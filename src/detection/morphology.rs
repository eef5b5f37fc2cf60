//! Morphology Filter
//!
//! Cleans the classification mask before region extraction.
//!
//! # Algorithm
//!
//! 1. Noise reduction: `iterations` erosion passes followed by the same number
//!    of dilation passes with a square kernel (an opening). Speckle smaller
//!    than the kernel disappears, solid regions keep their shape.
//! 2. Edge smoothing: Gaussian blur of the mask, re-thresholded at the
//!    configured intensity.
//!
//! The output is always a subset of the input mask.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};

use super::cancel::CancellationToken;
use super::color::MASK_ON;
use super::settings::{EdgeSmoothing, NoiseReduction};
use super::types::Result;

/// Mask refinement stages
pub struct MorphologyFilter;

impl MorphologyFilter {
    /// Apply noise reduction and edge smoothing as configured
    pub fn apply(
        mask: &GrayImage,
        noise_reduction: &NoiseReduction,
        edge_smoothing: &EdgeSmoothing,
    ) -> Result<GrayImage> {
        Self::apply_with_cancel(
            mask,
            noise_reduction,
            edge_smoothing,
            &CancellationToken::none(),
        )
    }

    /// Apply both stages, checking `cancel` between passes
    pub fn apply_with_cancel(
        mask: &GrayImage,
        noise_reduction: &NoiseReduction,
        edge_smoothing: &EdgeSmoothing,
        cancel: &CancellationToken,
    ) -> Result<GrayImage> {
        let mut refined = mask.clone();

        if noise_reduction.enabled {
            refined = Self::open(
                &refined,
                noise_reduction.kernel_size,
                noise_reduction.iterations,
                cancel,
            )?;
        }

        if edge_smoothing.enabled {
            cancel.check()?;
            refined = Self::smooth(&refined, edge_smoothing.blur_radius, edge_smoothing.threshold);
        }

        Self::intersect_in_place(&mut refined, mask);
        Ok(refined)
    }

    /// Erode then dilate with a `kernel_size` square, `iterations` times each
    fn open(
        mask: &GrayImage,
        kernel_size: u8,
        iterations: u8,
        cancel: &CancellationToken,
    ) -> Result<GrayImage> {
        // L-infinity ball of radius k is a (2k+1) square
        let k = kernel_size / 2;
        let mut current = mask.clone();

        for _ in 0..iterations {
            cancel.check()?;
            current = erode(&current, Norm::LInf, k);
        }
        for _ in 0..iterations {
            cancel.check()?;
            current = dilate(&current, Norm::LInf, k);
        }

        Ok(current)
    }

    /// Blur and re-threshold the mask
    fn smooth(mask: &GrayImage, blur_radius: u8, threshold: u8) -> GrayImage {
        let blurred = gaussian_blur_f32(mask, blur_radius.max(1) as f32);
        let (width, height) = mask.dimensions();
        let mut out = GrayImage::new(width, height);

        for (x, y, pixel) in blurred.enumerate_pixels() {
            if pixel.0[0] >= threshold {
                out.put_pixel(x, y, Luma([MASK_ON]));
            }
        }

        out
    }

    /// Clear every pixel of `mask` that is off in `bound`
    fn intersect_in_place(mask: &mut GrayImage, bound: &GrayImage) {
        for (m, b) in mask.pixels_mut().zip(bound.pixels()) {
            if b.0[0] == 0 {
                m.0[0] = 0;
            }
        }
    }

    /// Count non-zero mask pixels
    pub fn area(mask: &GrayImage) -> u64 {
        mask.pixels().filter(|p| p.0[0] > 0).count() as u64
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_block(width: u32, height: u32, x0: u32, y0: u32, w: u32, h: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
        mask
    }

    fn disabled_smoothing() -> EdgeSmoothing {
        EdgeSmoothing {
            enabled: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_opening_removes_speckle() {
        let mut mask = mask_with_block(60, 60, 20, 20, 20, 20);
        // Isolated noise pixels
        mask.put_pixel(3, 3, Luma([MASK_ON]));
        mask.put_pixel(50, 5, Luma([MASK_ON]));
        mask.put_pixel(51, 5, Luma([MASK_ON]));

        let refined =
            MorphologyFilter::apply(&mask, &NoiseReduction::default(), &disabled_smoothing())
                .unwrap();

        assert_eq!(refined.get_pixel(3, 3).0[0], 0);
        assert_eq!(refined.get_pixel(50, 5).0[0], 0);
        assert_eq!(MorphologyFilter::area(&refined), 400);
    }

    #[test]
    fn test_opening_preserves_solid_rectangle() {
        let mask = mask_with_block(50, 50, 10, 10, 25, 15);
        let nr = NoiseReduction {
            enabled: true,
            kernel_size: 5,
            iterations: 2,
        };
        let refined = MorphologyFilter::apply(&mask, &nr, &disabled_smoothing()).unwrap();
        assert_eq!(refined, mask);
    }

    #[test]
    fn test_disabled_is_identity() {
        let mut mask = mask_with_block(20, 20, 2, 2, 5, 5);
        mask.put_pixel(15, 15, Luma([MASK_ON]));
        let nr = NoiseReduction {
            enabled: false,
            ..Default::default()
        };
        let refined = MorphologyFilter::apply(&mask, &nr, &disabled_smoothing()).unwrap();
        assert_eq!(refined, mask);
    }

    #[test]
    fn test_smoothing_never_grows_area() {
        // L-shape: blur would fill the inner corner without the intersection
        let mut mask = mask_with_block(40, 40, 5, 5, 30, 8);
        for y in 13..35 {
            for x in 5..13 {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
        let before = MorphologyFilter::area(&mask);

        let es = EdgeSmoothing {
            enabled: true,
            blur_radius: 3,
            threshold: 64,
        };
        let nr = NoiseReduction {
            enabled: false,
            ..Default::default()
        };
        let refined = MorphologyFilter::apply(&mask, &nr, &es).unwrap();
        assert!(MorphologyFilter::area(&refined) <= before);
        assert_eq!(refined.get_pixel(20, 20).0[0], 0);
    }

    #[test]
    fn test_smoothing_rounds_corners() {
        let mask = mask_with_block(40, 40, 10, 10, 20, 20);
        let es = EdgeSmoothing {
            enabled: true,
            blur_radius: 2,
            threshold: 128,
        };
        let nr = NoiseReduction {
            enabled: false,
            ..Default::default()
        };
        let refined = MorphologyFilter::apply(&mask, &nr, &es).unwrap();
        assert_eq!(refined.get_pixel(10, 10).0[0], 0);
        assert_eq!(refined.get_pixel(20, 20).0[0], MASK_ON);
    }

    #[test]
    fn test_cancelled_filter() {
        let mask = mask_with_block(20, 20, 2, 2, 5, 5);
        let token = CancellationToken::new();
        token.cancel();
        let result = MorphologyFilter::apply_with_cancel(
            &mask,
            &NoiseReduction::default(),
            &disabled_smoothing(),
            &token,
        );
        assert!(result.is_err());
    }
}
