//! Command-line interface definitions

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::composite::LogoPlacement;
use crate::config::CliOverrides;
use crate::constraint::PlacementType;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_NOT_FOUND: i32 = 2;
    pub const INVALID_CONFIG: i32 = 3;
    /// No template had a usable placement zone
    pub const NO_REGION: i32 = 4;
}

/// Placement-zone detection and logo compositing for mockup templates
#[derive(Parser, Debug)]
#[command(name = "mockup-placement", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect placement zones in one or more templates
    Detect(DetectArgs),

    /// Composite a logo onto a template
    Composite(CompositeArgs),

    /// Show presets, defaults and the config file location
    Info,
}

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Template images to scan
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the composite command
#[derive(Args, Debug)]
pub struct CompositeArgs {
    /// Template (background) image
    #[arg(short, long)]
    pub template: PathBuf,

    /// Logo image, or a file holding a data: URL
    #[arg(short, long)]
    pub logo: PathBuf,

    /// Output PNG path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Logo box left edge (with --width/--height)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub x: i32,

    /// Logo box top edge (with --width/--height)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub y: i32,

    /// Logo box width; omit to use the detected zone
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Logo box height; omit to use the detected zone
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl CompositeArgs {
    /// Caller-specified box, if width and height were given
    pub fn explicit_placement(&self) -> Option<LogoPlacement> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(LogoPlacement::new(self.x, self.y, width, height)),
            _ => None,
        }
    }
}

/// Options shared by every processing command
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Config file (default: user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Color preset: strict, standard, wide
    #[arg(long)]
    pub preset: Option<String>,

    /// Color tolerance in percent (0-30)
    #[arg(long)]
    pub tolerance: Option<f32>,

    /// Minimum region area in pixels
    #[arg(long)]
    pub min_area: Option<u32>,

    /// Maximum region area in pixels
    #[arg(long)]
    pub max_area: Option<u32>,

    /// Enable morphological noise reduction
    #[arg(long, overrides_with = "no_noise_reduction")]
    pub noise_reduction: bool,

    /// Disable morphological noise reduction
    #[arg(long, overrides_with = "noise_reduction")]
    pub no_noise_reduction: bool,

    /// Structuring element size (odd, 3-9)
    #[arg(long)]
    pub kernel_size: Option<u8>,

    /// Erosion/dilation passes (1-3)
    #[arg(long)]
    pub iterations: Option<u8>,

    /// Enable edge smoothing
    #[arg(long, overrides_with = "no_edge_smoothing")]
    pub edge_smoothing: bool,

    /// Disable edge smoothing
    #[arg(long, overrides_with = "edge_smoothing")]
    pub no_edge_smoothing: bool,

    /// Gaussian blur radius for edge smoothing (1-5)
    #[arg(long)]
    pub blur_radius: Option<u8>,

    /// Re-threshold level after blurring (64-192)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Minimum logo width
    #[arg(long)]
    pub min_width: Option<u32>,

    /// Minimum logo height
    #[arg(long)]
    pub min_height: Option<u32>,

    /// Maximum logo width
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Maximum logo height
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Placement type: chest, full_front, back, sleeve, badge, banner, generic
    #[arg(long, value_parser = parse_placement_type)]
    pub placement: Option<PlacementType>,

    /// Worker threads (default: one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl CommonArgs {
    /// Overrides for values given explicitly on the command line
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            preset: self.preset.clone(),
            tolerance: self.tolerance,
            min_area: self.min_area,
            max_area: self.max_area,
            noise_reduction: flag_pair(self.noise_reduction, self.no_noise_reduction),
            kernel_size: self.kernel_size,
            iterations: self.iterations,
            edge_smoothing: flag_pair(self.edge_smoothing, self.no_edge_smoothing),
            blur_radius: self.blur_radius,
            threshold: self.threshold,
            min_width: self.min_width,
            min_height: self.min_height,
            max_width: self.max_width,
            max_height: self.max_height,
            placement_type: self.placement,
            threads: self.threads,
        }
    }
}

/// `--x` / `--no-x` pair; the last one given wins, neither leaves the config alone
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn parse_placement_type(s: &str) -> Result<PlacementType, String> {
    s.parse().map_err(|e: crate::constraint::ConstraintError| e.to_string())
}

// ============================================================
// Tests
// ============================================================
