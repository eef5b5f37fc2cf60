//! Common types for the detection module
//!
//! Contains the pixel buffer handed to the classifier, the region/result
//! structures produced by the extractor, and the module error type.

use image::{DynamicImage, ImageError, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::settings::SettingsError;

// ============================================================
// Error Types
// ============================================================

/// Detection error types
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid detection settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("Detection cancelled")]
    Cancelled,

    #[error("Detection deadline exceeded")]
    DeadlineExceeded,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ImageError> for DetectionError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(e) => DetectionError::UnsupportedFormat(e.to_string()),
            ImageError::IoError(e) => DetectionError::IoError(e),
            other => DetectionError::InvalidImage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectionError>;

// ============================================================
// Pixel Buffer
// ============================================================

/// Flat RGBA pixel buffer owned by a single detection call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Bytes per pixel (RGBA)
    pub const CHANNELS: usize = 4;

    /// Create a buffer from raw RGBA bytes
    ///
    /// Fails with `InvalidImage` when a dimension is zero or the byte count
    /// does not equal `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DetectionError::InvalidImage(format!(
                "zero dimension: {}x{}",
                width, height
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(Self::CHANNELS))
            .ok_or_else(|| {
                DetectionError::InvalidImage(format!("dimensions overflow: {}x{}", width, height))
            })?;

        if data.len() != expected {
            return Err(DetectionError::InvalidImage(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap an already decoded RGBA image
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Decode an encoded raster (PNG, JPEG, ...) from memory
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(DetectionError::InvalidImage("empty input".to_string()));
        }
        let img = image::load_from_memory(bytes)?;
        Self::from_dynamic(&img)
    }

    /// Load and decode an image file
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DetectionError::ImageNotFound(path.to_path_buf()));
        }
        let img = image::open(path)?;
        Self::from_dynamic(&img)
    }

    /// Convert a decoded image of any color type
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        Self::from_rgba_image(img.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Raw RGBA bytes
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// One row of RGBA bytes
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * Self::CHANNELS;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }
}

// ============================================================
// Geometry
// ============================================================

/// Axis-aligned rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check that the rectangle lies inside a `width x height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

/// Sub-pixel point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

// ============================================================
// Detection Output
// ============================================================

/// One connected region of target-colored pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    /// Number of target pixels in the component
    pub pixel_count: u32,

    /// Tight bounding box
    pub bounding_box: RegionRect,

    /// Share of the whole image area (0-100)
    pub percentage: f64,

    /// Mean pixel coordinate
    pub centroid: Point,

    /// Bounding box width / height
    pub aspect_ratio: f64,

    /// Quality score (0.0-1.0)
    pub confidence: f64,
}

impl DetectedRegion {
    /// Pixels divided by bounding-box area
    pub fn fill_ratio(&self) -> f64 {
        let area = self.bounding_box.area();
        if area == 0 {
            return 0.0;
        }
        (self.pixel_count as f64 / area as f64).min(1.0)
    }
}

/// Sampled color with its share of the sampled pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    /// Share of sampled opaque pixels (0-100)
    pub percentage: f64,
}

/// Result of one detection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Regions sorted by pixel count, largest first
    pub regions: Vec<DetectedRegion>,

    /// Sum of pixel counts over `regions`
    pub total_area: u64,

    /// Mean region confidence (0.0 when empty)
    pub average_confidence: f64,

    /// Wall time spent in detection
    #[serde(with = "duration_ms")]
    pub processing_time: Duration,

    /// True when at least one region survived filtering
    pub has_target_color: bool,

    /// Most common sampled colors
    pub dominant_colors: Vec<DominantColor>,

    /// Image dimensions
    pub image_size: (u32, u32),

    /// Connected components before area filtering
    pub raw_component_count: usize,

    /// Target pixels straight from the classifier
    pub classified_pixels: u64,

    /// Target pixels after morphology
    pub filtered_pixels: u64,
}

impl DetectionResult {
    /// Largest region, if any
    pub fn primary_region(&self) -> Option<&DetectedRegion> {
        self.regions.first()
    }

    /// Compare everything except timing
    pub fn same_detection(&self, other: &DetectionResult) -> bool {
        self.regions == other.regions
            && self.total_area == other.total_area
            && self.has_target_color == other.has_target_color
            && self.dominant_colors == other.dominant_colors
            && self.image_size == other.image_size
            && self.raw_component_count == other.raw_component_count
            && self.classified_pixels == other.classified_pixels
            && self.filtered_pixels == other.filtered_pixels
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}

// ============================================================
// Tests
// ============================================================
