//! mockup-placement - placement-zone detection and logo compositing
//!
//! CLI entry point

use anyhow::{bail, Context, Result};
use clap::Parser;
use mockup_placement::{
    batch_progress_bar, exit_codes,
    // CLI
    Cli, Commands, CommonArgs, CompositeArgs, DetectArgs,
    // Config
    Config, ConfigError,
    // Detection
    ColorPreset, DetectionError, DetectionSettings,
    // Pipeline
    DetectionPool, LogoSource, MockupPipeline, PipelineCache, PipelineError, PlacementType,
    TemplateAnalysis,
    // Progress tracking
    OutputMode, ProcessingStage, ProgressTracker,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Level;

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Detect(args) => init_logging(args.common.verbose, args.common.quiet),
        Commands::Composite(args) => init_logging(args.common.verbose, args.common.quiet),
        Commands::Info => init_logging(0, false),
    }

    let result = match &cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Composite(args) => run_composite(args),
        Commands::Info => run_info(),
    };

    std::process::exit(match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

/// Install the stderr logger; `-v` raises and `-q` lowers the level
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Map an error chain to a process exit code
fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_codes::INVALID_CONFIG;
        }
        if let Some(PipelineError::Config(_)) = cause.downcast_ref::<PipelineError>() {
            return exit_codes::INVALID_CONFIG;
        }
        if let Some(DetectionError::ImageNotFound(_)) = cause.downcast_ref::<DetectionError>() {
            return exit_codes::INPUT_NOT_FOUND;
        }
    }
    exit_codes::GENERAL_ERROR
}

// ============ Helper Functions ============

/// Load the config file (explicit or default) and apply CLI overrides
fn load_config(common: &CommonArgs) -> Result<Config> {
    let file_config = match &common.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let config = file_config.merge_with_cli(&common.overrides());
    tracing::debug!(config = %config.to_json(), "effective configuration");
    Ok(config)
}

fn require_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DetectionError::ImageNotFound(path.to_path_buf()).into());
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============ Detect Command ============

fn run_detect(args: &DetectArgs) -> Result<i32> {
    let start_time = Instant::now();
    let mode = OutputMode::from_flags(args.common.verbose, args.common.quiet);

    for template in &args.templates {
        require_exists(template)?;
    }

    let config = load_config(&args.common)?;
    let pipeline = MockupPipeline::from_config(&config)?.with_cache(Arc::new(PipelineCache::new()));
    let pool = DetectionPool::new(config.threads)?;

    let bar_mode = if args.json { OutputMode::Quiet } else { mode };
    let bar = batch_progress_bar(args.templates.len(), bar_mode);

    let reports: Vec<(PathBuf, Result<TemplateAnalysis>)> = pool.map(&args.templates, |path| {
        let analysis = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|bytes| {
                pipeline
                    .analyze(&bytes)
                    .with_context(|| format!("Failed to analyze {}", path.display()))
            });
        bar.inc(1);
        (path.clone(), analysis)
    });
    bar.finish_and_clear();

    let with_zone = reports
        .iter()
        .filter(|(_, r)| r.as_ref().is_ok_and(|a| a.detection.primary_region().is_some()))
        .count();
    let errors = reports.iter().filter(|(_, r)| r.is_err()).count();

    if args.json {
        print_json_reports(&reports)?;
    } else if mode.should_show(OutputMode::Normal) {
        for (path, report) in &reports {
            match report {
                Ok(analysis) => print_analysis(path, analysis, mode),
                Err(e) => eprintln!("{}: {:#}", path.display(), e),
            }
        }
        let without_zone = reports.len() - with_zone - errors;
        ProgressTracker::print_summary(reports.len(), with_zone, without_zone, errors);
        println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    if errors > 0 {
        bail!("{} template(s) failed to process", errors);
    }
    if with_zone == 0 {
        return Ok(exit_codes::NO_REGION);
    }
    Ok(exit_codes::SUCCESS)
}

fn print_json_reports(reports: &[(PathBuf, Result<TemplateAnalysis>)]) -> Result<()> {
    let entries: Vec<serde_json::Value> = reports
        .iter()
        .map(|(path, report)| match report {
            Ok(analysis) => serde_json::json!({
                "template": path.display().to_string(),
                "detection": analysis.detection,
                "validation": analysis.validation,
                "metrics": analysis.metrics,
            }),
            Err(e) => serde_json::json!({
                "template": path.display().to_string(),
                "error": format!("{:#}", e),
            }),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn print_analysis(path: &Path, analysis: &TemplateAnalysis, mode: OutputMode) {
    let detection = &analysis.detection;
    let validation = &analysis.validation;

    println!("{}", path.display());
    match detection.primary_region() {
        Some(region) => {
            let bbox = &region.bounding_box;
            println!(
                "  Zone: {}x{} at ({}, {}), {} px ({:.2}%), confidence {:.2}",
                bbox.width,
                bbox.height,
                bbox.x,
                bbox.y,
                region.pixel_count,
                region.percentage,
                region.confidence
            );
            println!(
                "  Regions: {} kept of {} found",
                detection.regions.len(),
                detection.raw_component_count
            );
        }
        None => println!("  Zone: none"),
    }

    println!(
        "  Valid: {} (score {:.2})",
        if validation.is_valid { "yes" } else { "no" },
        validation.score
    );
    if let Some(area) = validation.usable_area {
        println!(
            "  Usable area: {}x{} at ({}, {})",
            area.width, area.height, area.x, area.y
        );
    }
    for (warning, recommendation) in validation.warnings.iter().zip(&validation.recommendations) {
        println!("  Warning [{}]: {}", warning.code(), recommendation);
    }

    if mode.should_show(OutputMode::Verbose) {
        let metrics = &analysis.metrics;
        let edges = &metrics.edge_distances;
        println!(
            "  Edges: top {} right {} bottom {} left {}",
            edges.top, edges.right, edges.bottom, edges.left
        );
        println!(
            "  Center offset: ({:.1}, {:.1}), compactness {:.2}",
            metrics.center_offset.x, metrics.center_offset.y, metrics.compactness
        );
        println!(
            "  Mask pixels: {} classified, {} after filtering",
            detection.classified_pixels, detection.filtered_pixels
        );
        println!("  Time: {} ms", detection.processing_time.as_millis());
    }
    if mode.should_show(OutputMode::VeryVerbose) && !detection.dominant_colors.is_empty() {
        let colors: Vec<String> = detection
            .dominant_colors
            .iter()
            .map(|c| format!("{} ({:.1}%)", c.hex, c.percentage))
            .collect();
        println!("  Dominant colors: {}", colors.join(", "));
    }
}

// ============ Composite Command ============

fn run_composite(args: &CompositeArgs) -> Result<i32> {
    let mode = OutputMode::from_flags(args.common.verbose, args.common.quiet);
    let mut tracker = ProgressTracker::new(1, mode);
    tracker.start_template(1, &display_name(&args.template));

    require_exists(&args.template)?;
    require_exists(&args.logo)?;

    let config = load_config(&args.common)?;
    let pipeline = MockupPipeline::from_config(&config)?.with_cache(Arc::new(PipelineCache::new()));

    let template = std::fs::read(&args.template)
        .with_context(|| format!("Failed to read {}", args.template.display()))?;
    let logo = LogoSource::detect(
        std::fs::read(&args.logo)
            .with_context(|| format!("Failed to read {}", args.logo.display()))?,
    );

    tracker.set_stage(ProcessingStage::Classifying);
    let analysis = pipeline.analyze(&template)?;

    tracker.set_stage(ProcessingStage::Validating);
    if mode.should_show(OutputMode::Normal) {
        print_analysis(&args.template, &analysis, mode);
    }

    tracker.set_stage(ProcessingStage::Compositing);
    let outcome = pipeline.run(&template, &logo, args.explicit_placement(), None)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&args.output, &outcome.composite.png)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracker.complete();

    if mode.should_show(OutputMode::Normal) {
        let placement = &outcome.composite.placement;
        println!(
            "  Logo: {}x{} at ({}, {}) [{:?}]",
            placement.width, placement.height, placement.x, placement.y, outcome.placement_source
        );
        if let mockup_placement::LogoStatus::Fallback { reason } = &outcome.composite.logo_status {
            println!("  Logo could not be decoded, placeholder used: {}", reason);
        }
        println!("  Output: {}", args.output.display());
    }

    Ok(exit_codes::SUCCESS)
}

// ============ Info Command ============

fn run_info() -> Result<i32> {
    println!("mockup-placement v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("Color Presets (marker: pure green):");
    for preset in ColorPreset::all() {
        let range = preset.range();
        println!(
            "  {:<9} hue {:>3}-{:<3} sat >= {:.2}  val >= {:.2}  tolerance {}%{}",
            preset.name(),
            range.hue_min,
            range.hue_max,
            range.sat_min,
            range.val_min,
            range.tolerance,
            if preset == ColorPreset::default() { "  (default)" } else { "" }
        );
    }

    println!();
    println!("Placement Types:");
    for placement_type in PlacementType::all() {
        let (lo, hi) = placement_type.aspect_band();
        println!("  {:<10} aspect {:.2}-{:.2}", placement_type.name(), lo, hi);
    }

    let defaults = DetectionSettings::default();
    let dims = Config::default().constraints;
    println!();
    println!("Defaults:");
    println!("  Area: {}-{} px", defaults.min_area(), defaults.max_area());
    println!(
        "  Noise reduction: {} (kernel {}, {} iteration(s))",
        if defaults.noise_reduction().enabled { "on" } else { "off" },
        defaults.noise_reduction().kernel_size,
        defaults.noise_reduction().iterations
    );
    println!(
        "  Edge smoothing: {} (radius {}, threshold {})",
        if defaults.edge_smoothing().enabled { "on" } else { "off" },
        defaults.edge_smoothing().blur_radius,
        defaults.edge_smoothing().threshold
    );
    println!(
        "  Logo size: {}x{} to {}x{}",
        dims.min_width, dims.min_height, dims.max_width, dims.max_height
    );

    println!();
    println!("Config File Location:");
    match Config::default_path() {
        Some(path) => {
            let state = if path.exists() { "found" } else { "not present" };
            println!("  {} ({})", path.display(), state);
        }
        None => println!("  No user config directory on this platform"),
    }

    Ok(exit_codes::SUCCESS)
}
