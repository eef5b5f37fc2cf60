//! Logo compositing module
//!
//! Renders a logo onto a product background at a requested rectangle.
//!
//! # Features
//!
//! - Raw bytes or base64 `data:` URL logos ([`LogoSource`])
//! - Placeholder glyph when the logo cannot be decoded
//! - Logo size capped at 40% of the canvas per axis, aspect preserved
//! - PNG output with the final placement reported back
//!
//! # Example
//!
//! ```rust,no_run
//! use mockup_placement::composite::{Compositor, LogoPlacement, LogoSource};
//!
//! let background = std::fs::read("shirt.png").unwrap();
//! let logo = LogoSource::detect(std::fs::read("logo.png").unwrap());
//! let result = Compositor::composite(
//!     &background,
//!     &logo,
//!     LogoPlacement::new(120, 80, 160, 100),
//!     None,
//! )
//! .unwrap();
//! std::fs::write("mockup.png", &result.png).unwrap();
//! ```

mod compositor;
mod logo;
mod types;

// Re-export public API
pub use compositor::Compositor;
pub use logo::{fallback_glyph, LogoDecode, LogoSource};
pub use types::{
    CompositeError, CompositeResult, LogoDecodeError, LogoPlacement, LogoStatus, Result,
    FALLBACK_GLYPH_SIZE, MAX_CANVAS_DIMENSION, MAX_LOGO_BYTES, MAX_LOGO_FRACTION,
};
