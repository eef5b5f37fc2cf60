//! Color Classifier
//!
//! Marks every pixel whose HSV value falls inside the marker color window.
//!
//! # Algorithm
//!
//! 1. Skip pixels at or below the opacity floor
//! 2. Convert RGB to HSV
//! 3. Widen the hue window by the tolerance percentage
//! 4. Require saturation and value above the range floors

use image::{GrayImage, Luma};
use std::collections::HashMap;

use super::cancel::CancellationToken;
use super::settings::ColorRange;
use super::types::{DominantColor, PixelBuffer, Result};

// ============================================================
// Constants
// ============================================================

/// Pixels with alpha at or below this are never target
pub const OPACITY_FLOOR: u8 = 127;

/// Hue padding (degrees) per 100% tolerance
const HUE_DEGREES_PER_FULL_TOLERANCE: f32 = 60.0;

/// Mask value for target pixels
pub const MASK_ON: u8 = 255;

/// Approximate number of pixels sampled for dominant colors
const DOMINANT_SAMPLE_TARGET: u64 = 10_000;

/// Quantization step for dominant colors (32 levels per channel)
const DOMINANT_QUANT_STEP: u8 = 8;

/// Number of dominant colors reported
const DOMINANT_COLOR_COUNT: usize = 5;

// ============================================================
// Hue Window
// ============================================================

/// Effective HSV window after applying tolerance
#[derive(Debug, Clone, Copy)]
pub(crate) struct HsvWindow {
    hue_min: f32,
    hue_max: f32,
    full_circle: bool,
    sat_min: f32,
    val_min: f32,
}

impl HsvWindow {
    /// Widen `range` by `tolerance` percent
    pub(crate) fn new(range: &ColorRange, tolerance: f32) -> Self {
        let pad = tolerance.max(0.0) / 100.0 * HUE_DEGREES_PER_FULL_TOLERANCE;
        let span = if range.hue_min <= range.hue_max {
            range.hue_max - range.hue_min
        } else {
            360.0 - range.hue_min + range.hue_max
        };

        Self {
            hue_min: (range.hue_min - pad).rem_euclid(360.0),
            hue_max: (range.hue_max + pad).rem_euclid(360.0),
            full_circle: span + 2.0 * pad >= 360.0,
            sat_min: range.sat_min,
            val_min: range.val_min,
        }
    }

    /// Check if HSV values match this window
    pub(crate) fn matches(&self, h: f32, s: f32, v: f32) -> bool {
        let hue_match = if self.full_circle {
            true
        } else if self.hue_min > self.hue_max {
            // Wrapping range (e.g., 350-10)
            h >= self.hue_min || h <= self.hue_max
        } else {
            h >= self.hue_min && h <= self.hue_max
        };

        hue_match && s >= self.sat_min && v >= self.val_min
    }
}

// ============================================================
// Color Classifier
// ============================================================

/// Output of the classification pass
#[derive(Debug, Clone)]
pub struct ClassificationMask {
    /// Binary mask (255 = target, 0 = background)
    pub mask: GrayImage,

    /// Number of target pixels
    pub target_pixels: u64,
}

/// Per-pixel marker color classifier
pub struct ColorClassifier;

impl ColorClassifier {
    /// Classify every pixel of `image`
    pub fn classify(
        image: &PixelBuffer,
        range: &ColorRange,
        tolerance: f32,
    ) -> Result<ClassificationMask> {
        Self::classify_with_cancel(image, range, tolerance, &CancellationToken::none())
    }

    /// Classify, checking `cancel` between rows
    pub fn classify_with_cancel(
        image: &PixelBuffer,
        range: &ColorRange,
        tolerance: f32,
        cancel: &CancellationToken,
    ) -> Result<ClassificationMask> {
        let (width, height) = (image.width(), image.height());
        let window = HsvWindow::new(range, tolerance);
        let mut mask = GrayImage::new(width, height);
        let mut target_pixels = 0u64;

        for y in 0..height {
            cancel.check()?;
            for (x, px) in image.row(y).chunks_exact(PixelBuffer::CHANNELS).enumerate() {
                if Self::is_target(px, &window) {
                    mask.put_pixel(x as u32, y, Luma([MASK_ON]));
                    target_pixels += 1;
                }
            }
        }

        Ok(ClassificationMask {
            mask,
            target_pixels,
        })
    }

    fn is_target(px: &[u8], window: &HsvWindow) -> bool {
        if px[3] <= OPACITY_FLOOR {
            return false;
        }
        let (h, s, v) = Self::rgb_to_hsv(px[0], px[1], px[2]);
        window.matches(h, s, v)
    }

    /// Convert RGB to HSV (h in degrees, s and v in 0.0-1.0)
    pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
        let rf = r as f32 / 255.0;
        let gf = g as f32 / 255.0;
        let bf = b as f32 / 255.0;

        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let v = max;
        let d = max - min;
        let s = if max == 0.0 { 0.0 } else { d / max };

        let h = if d == 0.0 {
            0.0
        } else if max == rf {
            60.0 * (((gf - bf) / d) % 6.0)
        } else if max == gf {
            60.0 * (((bf - rf) / d) + 2.0)
        } else {
            60.0 * (((rf - gf) / d) + 4.0)
        };

        let h = if h < 0.0 { h + 360.0 } else { h };
        (h, s, v)
    }

    /// Sample the most common opaque colors
    ///
    /// Pixels are visited with a fixed stride so the result is deterministic.
    pub fn dominant_colors(image: &PixelBuffer) -> Vec<DominantColor> {
        let total = image.pixel_count();
        let stride = (total / DOMINANT_SAMPLE_TARGET).max(1) as usize;
        let mut counts: HashMap<[u8; 3], u64> = HashMap::new();
        let mut sampled = 0u64;

        for px in image
            .as_raw()
            .chunks_exact(PixelBuffer::CHANNELS)
            .step_by(stride)
        {
            if px[3] <= OPACITY_FLOOR {
                continue;
            }
            let quantize = |c: u8| c - c % DOMINANT_QUANT_STEP;
            *counts
                .entry([quantize(px[0]), quantize(px[1]), quantize(px[2])])
                .or_insert(0) += 1;
            sampled += 1;
        }

        if sampled == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<([u8; 3], u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(DOMINANT_COLOR_COUNT)
            .map(|(rgb, count)| DominantColor {
                rgb,
                hex: format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]),
                percentage: count as f64 / sampled as f64 * 100.0,
            })
            .collect()
    }
}

// ============================================================
// Tests
// ============================================================
