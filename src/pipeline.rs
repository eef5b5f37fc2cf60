//! End-to-end mockup pipeline
//!
//! Decode template → detect zone → validate → metrics → composite logo.
//!
//! The composite box is chosen in this order: an explicit placement from
//! the caller, the validator's usable area, the constraint fallback
//! placement when nothing was detected.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::cache::{CacheDigest, PipelineCache};
use crate::composite::{CompositeError, CompositeResult, Compositor, LogoPlacement, LogoSource};
use crate::config::{Config, ConfigError};
use crate::constraint::{
    ConstraintDimensions, ConstraintMetrics, ConstraintValidator, MetricsCalculator,
    PlacementType, ValidationResult,
};
use crate::detection::{
    self, CancellationToken, DetectionError, DetectionResult, DetectionSettings, PixelBuffer,
};

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Compositing failed: {0}")]
    Composite(#[from] CompositeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Outputs
// ============================================================

/// Where the composite box came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    Explicit,
    Detected,
    Fallback,
}

/// Detection plus constraint analysis of one template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateAnalysis {
    pub detection: Arc<DetectionResult>,
    pub validation: ValidationResult,
    pub metrics: ConstraintMetrics,
}

impl TemplateAnalysis {
    /// Box to composite into when the caller gives none
    pub fn suggested_placement(
        &self,
        dims: &ConstraintDimensions,
    ) -> (LogoPlacement, PlacementSource) {
        match self.validation.usable_area {
            Some(area) => (LogoPlacement::from(area), PlacementSource::Detected),
            None => (dims.fallback_placement(), PlacementSource::Fallback),
        }
    }
}

/// Everything the pipeline produced for one template and logo
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub analysis: TemplateAnalysis,
    pub requested: LogoPlacement,
    pub placement_source: PlacementSource,
    pub composite: Arc<CompositeResult>,
}

// ============================================================
// Pipeline
// ============================================================

/// Stateless orchestrator; safe to share across threads
#[derive(Clone, Default)]
pub struct MockupPipeline {
    settings: DetectionSettings,
    constraints: ConstraintDimensions,
    placement_type: PlacementType,
    cache: Option<Arc<PipelineCache>>,
}

impl MockupPipeline {
    pub fn new(
        settings: DetectionSettings,
        constraints: ConstraintDimensions,
        placement_type: PlacementType,
    ) -> Self {
        Self {
            settings,
            constraints,
            placement_type,
            cache: None,
        }
    }

    /// Build from a merged config, validating it
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.detection_settings()?,
            config.constraint_dimensions()?,
            config.placement_type,
        ))
    }

    /// Share results through `cache`
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<PipelineCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    pub fn constraints(&self) -> &ConstraintDimensions {
        &self.constraints
    }

    pub fn placement_type(&self) -> PlacementType {
        self.placement_type
    }

    /// Detect and validate an encoded template
    pub fn analyze(&self, template: &[u8]) -> Result<TemplateAnalysis> {
        self.analyze_with_cancel(template, &CancellationToken::none())
    }

    /// Detect and validate an encoded template under `cancel`
    pub fn analyze_with_cancel(
        &self,
        template: &[u8],
        cancel: &CancellationToken,
    ) -> Result<TemplateAnalysis> {
        let run = || -> detection::Result<DetectionResult> {
            let image = PixelBuffer::decode(template)?;
            detection::detect_with_cancel(&image, &self.settings, cancel)
        };

        let detection = match &self.cache {
            Some(cache) => {
                let key = CacheDigest::new(template, &self.settings.to_json());
                cache.detections.get_or_try_insert_with(&key, run)?
            }
            None => Arc::new(run()?),
        };

        Ok(self.evaluate(detection))
    }

    /// Detect and validate an already decoded template (uncached)
    pub fn analyze_image(&self, image: &PixelBuffer) -> Result<TemplateAnalysis> {
        let detection = detection::detect(image, &self.settings)?;
        Ok(self.evaluate(Arc::new(detection)))
    }

    fn evaluate(&self, detection: Arc<DetectionResult>) -> TemplateAnalysis {
        let validation = ConstraintValidator::validate_detection(
            &detection,
            &self.constraints,
            self.placement_type,
        );
        let (width, height) = detection.image_size;
        let metrics = MetricsCalculator::calculate(&detection.regions, width, height);

        TemplateAnalysis {
            detection,
            validation,
            metrics,
        }
    }

    /// Full run: analyze the template, then composite the logo onto it
    ///
    /// `placement` overrides the detected box; `canvas` defaults to the
    /// template size.
    pub fn run(
        &self,
        template: &[u8],
        logo: &LogoSource,
        placement: Option<LogoPlacement>,
        canvas: Option<(u32, u32)>,
    ) -> Result<PipelineOutcome> {
        let start = Instant::now();
        let analysis = self.analyze(template)?;

        let (requested, placement_source) = match placement {
            Some(explicit) => (explicit, PlacementSource::Explicit),
            None => analysis.suggested_placement(&self.constraints),
        };
        if placement_source == PlacementSource::Fallback {
            tracing::warn!(?requested, "no placement zone detected, using default placement");
        }

        let render = || Compositor::composite(template, logo, requested, canvas);
        let composite = match &self.cache {
            Some(cache) => {
                let key = composite_key(template, logo, requested, canvas);
                cache.composites.get_or_try_insert_with(&key, render)?
            }
            None => Arc::new(render()?),
        };

        tracing::info!(
            regions = analysis.detection.regions.len(),
            valid = analysis.validation.is_valid,
            score = analysis.validation.score,
            source = ?placement_source,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "mockup pipeline completed"
        );

        Ok(PipelineOutcome {
            analysis,
            requested,
            placement_source,
            composite,
        })
    }
}

fn composite_key(
    template: &[u8],
    logo: &LogoSource,
    placement: LogoPlacement,
    canvas: Option<(u32, u32)>,
) -> CacheDigest {
    let logo_bytes = match logo {
        LogoSource::Bytes(bytes) => bytes.as_slice(),
        LogoSource::Embedded(url) => url.as_bytes(),
    };
    let geometry = serde_json::json!({ "placement": placement, "canvas": canvas }).to_string();
    CacheDigest::from_parts(&[template, logo_bytes, geometry.as_bytes()])
}

// ============================================================
// Tests
// ============================================================
