//! Common types for the composite module

use image::ImageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::RegionRect;

// ============================================================
// Constants
// ============================================================

/// Largest share of the canvas a logo may cover on either axis
pub const MAX_LOGO_FRACTION: f64 = 0.40;

/// Largest accepted logo payload after decoding embedded data (20 MiB)
pub const MAX_LOGO_BYTES: usize = 20 * 1024 * 1024;

/// Largest accepted canvas side in pixels
pub const MAX_CANVAS_DIMENSION: u32 = 65_535;

/// Side length of the fallback placeholder glyph
pub const FALLBACK_GLYPH_SIZE: u32 = 64;

// ============================================================
// Error Types
// ============================================================

/// Fatal compositing errors
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Failed to load background: {0}")]
    ImageLoad(String),

    #[error("Unsupported background format: {0}")]
    UnsupportedFormat(String),

    #[error("Logo payload too large: {size} bytes (limit {limit})")]
    LogoTooLarge { size: usize, limit: usize },

    #[error("Invalid canvas size: {0}x{1}")]
    InvalidCanvas(u32, u32),

    #[error("Failed to encode composite: {0}")]
    EncodeFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CompositeError {
    /// Classify a background decode failure
    pub(crate) fn from_background(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(e) => CompositeError::UnsupportedFormat(e.to_string()),
            other => CompositeError::ImageLoad(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompositeError>;

/// Recoverable logo decode failure; triggers the placeholder glyph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogoDecodeError {
    #[error("logo payload is empty")]
    EmptyPayload,

    #[error("logo data is truncated: {0}")]
    Truncated(String),

    #[error("logo data is malformed: {0}")]
    Malformed(String),

    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("logo has zero width or height")]
    ZeroDimensions,
}

impl From<ImageError> for LogoDecodeError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                LogoDecodeError::Truncated(e.to_string())
            }
            other => LogoDecodeError::Malformed(other.to_string()),
        }
    }
}

// ============================================================
// Placement
// ============================================================

/// Logo rectangle on the canvas
///
/// Requested placements may start off-canvas; placements returned by the
/// compositor always lie fully inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogoPlacement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl LogoPlacement {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check containment in `[0, canvas_width] x [0, canvas_height]`
    pub fn fits_within(&self, canvas_width: u32, canvas_height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= canvas_width as i64
            && self.y as i64 + self.height as i64 <= canvas_height as i64
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

impl From<RegionRect> for LogoPlacement {
    fn from(rect: RegionRect) -> Self {
        Self {
            x: rect.x as i32,
            y: rect.y as i32,
            width: rect.width,
            height: rect.height,
        }
    }
}

// ============================================================
// Result
// ============================================================

/// How the logo was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogoStatus {
    Decoded,
    Fallback { reason: String },
}

impl LogoStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, LogoStatus::Fallback { .. })
    }
}

/// Final composite raster and the geometry actually used
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// PNG-encoded output
    pub png: Vec<u8>,

    /// Final, clamped logo rectangle
    pub placement: LogoPlacement,

    pub canvas_width: u32,
    pub canvas_height: u32,

    pub logo_status: LogoStatus,
}

// ============================================================
// Tests
// ============================================================
