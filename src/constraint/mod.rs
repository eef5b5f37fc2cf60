//! Placement constraint module
//!
//! Turns a detected zone into a placement rectangle that respects the
//! caller's size rules, and reports how well the zone fits.
//!
//! # Features
//!
//! - **Validator** ([`validator`]) - usable area, warnings, recommendations, score
//! - **Metrics** ([`metrics`]) - edge distances, center offset, compactness
//!
//! Size, shape and fragmentation problems are reported as warnings; nothing
//! in this module fails on bad data. Only constructing
//! [`ConstraintDimensions`] with min > max is an error.

pub mod metrics;
mod types;
pub mod validator;

// Re-export public API
pub use metrics::MetricsCalculator;
pub use types::{
    CenterOffset, ConstraintDimensions, ConstraintError, ConstraintMetrics, EdgeDistances,
    PlacementType, Result, ValidationResult, ValidationWarning,
};
pub use validator::{ConstraintValidator, VALID_SCORE_THRESHOLD};
