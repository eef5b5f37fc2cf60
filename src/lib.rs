//! mockup-placement - placement-zone detection and logo compositing
//!
//! Finds the marker-colored zone painted on a product mockup template,
//! checks it against size rules and composites a logo into it.
//!
//! # Modules
//!
//! - [`detection`] - marker color classification, morphology, region extraction
//! - [`constraint`] - usable area, warnings, score and geometry metrics
//! - [`composite`] - logo decoding and compositing
//! - [`pipeline`] - end-to-end orchestration
//! - [`cache`] - content-hash single-flight result cache
//! - [`pool`] - detection worker pool
//!
//! # Example
//!
//! ```rust,no_run
//! use mockup_placement::{LogoSource, MockupPipeline};
//!
//! let template = std::fs::read("tshirt_template.png").unwrap();
//! let logo = LogoSource::detect(std::fs::read("logo.png").unwrap());
//!
//! let outcome = MockupPipeline::default().run(&template, &logo, None, None).unwrap();
//! println!("valid: {}", outcome.analysis.validation.is_valid);
//! std::fs::write("mockup.png", &outcome.composite.png).unwrap();
//! ```

pub mod cache;
pub mod cli;
pub mod composite;
pub mod config;
pub mod constraint;
pub mod detection;
pub mod pipeline;
pub mod pool;
pub mod progress;

// Re-export public API
pub use cache::{CacheDigest, CacheStats, PipelineCache, ResultCache};
pub use cli::{exit_codes, Cli, Commands, CommonArgs, CompositeArgs, DetectArgs};
pub use composite::{
    CompositeError, CompositeResult, Compositor, LogoDecode, LogoPlacement, LogoSource, LogoStatus,
};
pub use config::{CliOverrides, Config, ConfigError};
pub use constraint::{
    ConstraintDimensions, ConstraintMetrics, ConstraintValidator, MetricsCalculator,
    PlacementType, ValidationResult, ValidationWarning,
};
pub use detection::{
    detect, detect_with_cancel, CancellationToken, ColorPreset, ColorRange, DetectedRegion,
    DetectionError, DetectionResult, DetectionSettings, PixelBuffer, RegionRect,
};
pub use pipeline::{
    MockupPipeline, PipelineError, PipelineOutcome, PlacementSource, TemplateAnalysis,
};
pub use pool::{DetectionHandle, DetectionPool, PoolError};
pub use progress::{batch_progress_bar, OutputMode, ProcessingStage, ProgressTracker};
