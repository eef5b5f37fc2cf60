//! Logo decoding with placeholder fallback
//!
//! A logo arrives either as raw encoded bytes or inlined as a
//! `data:<mime>;base64,<payload>` URL. Anything that cannot be decoded is
//! replaced by a placeholder glyph; only an oversized payload is fatal.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::types::{CompositeError, LogoDecodeError, Result, FALLBACK_GLYPH_SIZE, MAX_LOGO_BYTES};

/// Data URL prefix
const DATA_URL_PREFIX: &str = "data:";

/// Placeholder plate color
const GLYPH_FILL: Rgba<u8> = Rgba([224, 224, 224, 255]);

/// Placeholder border and cross color
const GLYPH_INK: Rgba<u8> = Rgba([150, 150, 150, 255]);

// ============================================================
// Logo Source
// ============================================================

/// Logo input as handed to the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoSource {
    /// Encoded raster bytes (PNG, JPEG, ...)
    Bytes(Vec<u8>),

    /// Inlined `data:` URL
    Embedded(String),
}

impl LogoSource {
    /// Classify raw input, recognising inlined data URLs
    pub fn detect(bytes: Vec<u8>) -> Self {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let trimmed = &bytes[start..];
        if trimmed.starts_with(DATA_URL_PREFIX.as_bytes()) {
            LogoSource::Embedded(String::from_utf8_lossy(trimmed).into_owned())
        } else {
            LogoSource::Bytes(bytes)
        }
    }

    /// Decode the logo
    ///
    /// Returns `Err` only for hard failures; undecodable data becomes
    /// [`LogoDecode::Fallback`].
    pub fn decode(&self) -> Result<LogoDecode> {
        let bytes = match self {
            LogoSource::Bytes(bytes) => std::borrow::Cow::Borrowed(bytes.as_slice()),
            LogoSource::Embedded(url) => match Self::decode_data_url(url) {
                Ok(bytes) => std::borrow::Cow::Owned(bytes),
                Err(reason) => return Ok(LogoDecode::fallback(reason)),
            },
        };

        if bytes.len() > MAX_LOGO_BYTES {
            return Err(CompositeError::LogoTooLarge {
                size: bytes.len(),
                limit: MAX_LOGO_BYTES,
            });
        }

        Ok(match Self::decode_raster(&bytes) {
            Ok(image) => LogoDecode::Decoded(image),
            Err(reason) => LogoDecode::fallback(reason),
        })
    }

    fn decode_raster(bytes: &[u8]) -> std::result::Result<DynamicImage, LogoDecodeError> {
        if bytes.is_empty() {
            return Err(LogoDecodeError::EmptyPayload);
        }
        let image = image::load_from_memory(bytes)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(LogoDecodeError::ZeroDimensions);
        }
        Ok(image)
    }

    /// Extract the payload of a base64 data URL
    fn decode_data_url(url: &str) -> std::result::Result<Vec<u8>, LogoDecodeError> {
        let rest = url
            .trim()
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| LogoDecodeError::InvalidDataUrl("missing data: prefix".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| LogoDecodeError::InvalidDataUrl("missing ',' separator".to_string()))?;

        if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
            return Err(LogoDecodeError::InvalidDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }

        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(LogoDecodeError::EmptyPayload);
        }

        BASE64
            .decode(cleaned.as_bytes())
            .map_err(|e| LogoDecodeError::Base64(e.to_string()))
    }
}

// ============================================================
// Decode Outcome
// ============================================================

/// Decoded logo or placeholder with the reason it was needed
#[derive(Debug, Clone)]
pub enum LogoDecode {
    Decoded(DynamicImage),
    Fallback {
        image: DynamicImage,
        reason: LogoDecodeError,
    },
}

impl LogoDecode {
    fn fallback(reason: LogoDecodeError) -> Self {
        LogoDecode::Fallback {
            image: DynamicImage::ImageRgba8(fallback_glyph()),
            reason,
        }
    }

    /// Image to composite, real or placeholder
    pub fn image(&self) -> &DynamicImage {
        match self {
            LogoDecode::Decoded(image) => image,
            LogoDecode::Fallback { image, .. } => image,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, LogoDecode::Fallback { .. })
    }
}

/// Light plate with a border and a diagonal cross
pub fn fallback_glyph() -> RgbaImage {
    let size = FALLBACK_GLYPH_SIZE;
    let mut glyph = RgbaImage::new(size, size);
    let inset = size / 8;
    let inner = size - 2 * inset;
    let plate = Rect::at(inset as i32, inset as i32).of_size(inner, inner);

    draw_filled_rect_mut(&mut glyph, plate, GLYPH_FILL);
    draw_hollow_rect_mut(&mut glyph, plate, GLYPH_INK);

    let (lo, hi) = (inset as f32, (inset + inner - 1) as f32);
    draw_line_segment_mut(&mut glyph, (lo, lo), (hi, hi), GLYPH_INK);
    draw_line_segment_mut(&mut glyph, (lo, hi), (hi, lo), GLYPH_INK);

    glyph
}

// ============================================================
// Tests
// ============================================================
