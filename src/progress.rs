//! Progress tracking for template processing.
//!
//! Stage display for single templates and an `indicatif` bar for batches.

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::time::Instant;

/// Processing stages of the mockup pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    /// Reading and decoding the template
    #[default]
    Loading,
    /// Marker color classification
    Classifying,
    /// Morphological cleanup
    Filtering,
    /// Connected-component extraction
    Extracting,
    /// Constraint validation
    Validating,
    /// Logo compositing
    Compositing,
    /// Completed
    Completed,
}

impl ProcessingStage {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Loading => "Loading",
            ProcessingStage::Classifying => "Classifying",
            ProcessingStage::Filtering => "Filtering",
            ProcessingStage::Extracting => "Extracting",
            ProcessingStage::Validating => "Validating",
            ProcessingStage::Compositing => "Compositing",
            ProcessingStage::Completed => "Completed",
        }
    }

    /// Short human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Loading => "decoding template",
            ProcessingStage::Classifying => "matching marker color",
            ProcessingStage::Filtering => "removing noise",
            ProcessingStage::Extracting => "labeling regions",
            ProcessingStage::Validating => "checking size rules",
            ProcessingStage::Compositing => "placing logo",
            ProcessingStage::Completed => "done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Normal output (stage display only)
    #[default]
    Normal,
    /// Verbose output (per-template details)
    Verbose,
    /// Very verbose (all items displayed)
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from `-v` count and `--quiet`
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return OutputMode::Quiet;
        }
        match verbose {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

/// Batch progress bar template
const BAR_TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}";

/// Progress bar for `total` templates; hidden unless the mode shows normal output
pub fn batch_progress_bar(total: usize, mode: OutputMode) -> ProgressBar {
    if !mode.should_show(OutputMode::Normal) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Progress tracker for single-template runs
#[derive(Debug)]
pub struct ProgressTracker {
    /// Current template number (1-based)
    pub current_template: usize,
    /// Total number of templates
    pub total_templates: usize,
    /// Current template name
    pub current_name: String,
    /// Current processing stage
    pub current_stage: ProcessingStage,
    start_time: Instant,
    output_mode: OutputMode,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(1, OutputMode::Normal)
    }
}

impl ProgressTracker {
    pub fn new(total_templates: usize, output_mode: OutputMode) -> Self {
        Self {
            current_template: 0,
            total_templates,
            current_name: String::new(),
            current_stage: ProcessingStage::Loading,
            start_time: Instant::now(),
            output_mode,
        }
    }

    /// Start processing a new template
    pub fn start_template(&mut self, number: usize, name: &str) {
        self.current_template = number;
        self.current_name = name.to_string();
        self.current_stage = ProcessingStage::Loading;
        self.start_time = Instant::now();

        if self.output_mode.should_show(OutputMode::Verbose) {
            eprintln!(
                "[{}/{}] {}",
                self.current_template, self.total_templates, self.current_name
            );
        }
    }

    pub fn set_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = stage;
        if self.output_mode.should_show(OutputMode::Verbose) {
            eprintln!("  Stage: {}", self.current_stage);
        }
    }

    /// Mark the current template as complete
    pub fn complete(&mut self) {
        self.current_stage = ProcessingStage::Completed;
        if self.output_mode.should_show(OutputMode::Verbose) {
            eprintln!("  Completed in {:.2}s", self.elapsed_secs());
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Print final batch summary
    pub fn print_summary(total: usize, with_zone: usize, without_zone: usize, errors: usize) {
        println!();
        println!("{}", "=".repeat(60));
        println!("Detection Summary");
        println!("{}", "=".repeat(60));
        println!("  Templates:     {}", total);
        println!("  Zone found:    {}", with_zone);
        println!("  No zone:       {}", without_zone);
        println!("  Errors:        {}", errors);
        println!("{}", "=".repeat(60));
    }
}

// ============================================================
// Tests
// ============================================================
