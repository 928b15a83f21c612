//! Command-line interface for echomask.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::grid::GridAxes;
use crate::core::{loaders, transforms, writers};
use crate::masks::{self, BinaryMask, MissingFloorPolicy};
use crate::visualization;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "echomask")]
#[command(about = "Signal/noise masking for echosounder Sv grids", version)]
pub struct Cli {
    /// Path to YAML config file (an unreadable or invalid file is an error)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark cells above an Sv threshold as signal
    Threshold {
        /// Input Sv grid CSV
        sv_file: PathBuf,
        /// Output mask CSV
        output: PathBuf,
        /// Threshold in dB re 1 m^-1 (overrides config)
        #[arg(long, allow_negative_numbers = true)]
        threshold_db: Option<f64>,
    },

    /// Mask the transmit pulse and near field of every ping
    Pulse {
        /// Input Sv grid CSV
        sv_file: PathBuf,
        /// Output mask CSV
        output: PathBuf,
        /// Background noise level in dB re 1 m^-1 (overrides config)
        #[arg(long, allow_negative_numbers = true)]
        noise_level_db: Option<f64>,
        /// Fail if a ping never reaches the noise level instead of leaving it unmasked
        #[arg(long)]
        fail_on_missing_floor: bool,
    },

    /// Mask single-sample impulse noise spikes
    Impulse {
        /// Input Sv grid CSV
        sv_file: PathBuf,
        /// Output mask CSV
        output: PathBuf,
        /// Minimum rise above both neighbours in dB (overrides config)
        #[arg(long, allow_negative_numbers = true)]
        threshold_db: Option<f64>,
    },

    /// Combine binary masks into a flag mask (first mask = most significant bit)
    Combine {
        /// Output flag mask CSV
        output: PathBuf,
        /// Binary mask CSVs, most significant first
        #[arg(required = true, num_args = 1..)]
        masks: Vec<PathBuf>,
    },

    /// Build a presence/absence mask (signal in any input mask)
    Presence {
        /// Output mask CSV
        output: PathBuf,
        /// Binary mask CSVs
        #[arg(required = true, num_args = 1..)]
        masks: Vec<PathBuf>,
    },

    /// Run every configured mask generator and combine the results
    Run {
        /// Input Sv grid CSV
        sv_file: PathBuf,
        /// Output directory for masks
        output_dir: PathBuf,
    },

    /// Render an Sv echogram as PNG
    Plot {
        /// Input Sv grid CSV
        sv_file: PathBuf,
        /// Output PNG file path
        output: PathBuf,
        /// Binary mask CSV to apply before rendering
        #[arg(short, long)]
        mask: Option<PathBuf>,
    },

    /// Render a flag mask as PNG
    PlotFlags {
        /// Input flag mask CSV
        flags_file: PathBuf,
        /// Output PNG file path
        output: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// File stem used to label a mask in listings.
fn mask_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Dispatch to subcommands
    let result = match cli.command {
        Commands::Threshold {
            sv_file,
            output,
            threshold_db,
        } => cmd_threshold(&sv_file, &output, threshold_db, &config),
        Commands::Pulse {
            sv_file,
            output,
            noise_level_db,
            fail_on_missing_floor,
        } => cmd_pulse(&sv_file, &output, noise_level_db, fail_on_missing_floor, &config),
        Commands::Impulse {
            sv_file,
            output,
            threshold_db,
        } => cmd_impulse(&sv_file, &output, threshold_db, &config),
        Commands::Combine { output, masks } => cmd_combine(&output, &masks),
        Commands::Presence { output, masks } => cmd_presence(&output, &masks),
        Commands::Run {
            sv_file,
            output_dir,
        } => cmd_run(&sv_file, &output_dir, &config),
        Commands::Plot {
            sv_file,
            output,
            mask,
        } => cmd_plot(&sv_file, &output, mask.as_deref(), &config),
        Commands::PlotFlags { flags_file, output } => cmd_plot_flags(&flags_file, &output, &config),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let config = PipelineConfig::from_yaml(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    info!("Loaded config from: {}", path.display());
    Ok(config)
}

fn load_grid(sv_file: &Path) -> Result<crate::SvGrid> {
    loaders::load_sv_csv(sv_file)
        .with_context(|| format!("Failed to load Sv grid: {}", sv_file.display()))
}

fn write_mask(output: &Path, mask: &BinaryMask, axes: &GridAxes) -> Result<()> {
    writers::write_grid_csv(output, mask.view(), axes)
        .with_context(|| format!("Failed to write mask: {}", output.display()))
}

fn load_masks(paths: &[PathBuf]) -> Result<(Vec<BinaryMask>, GridAxes)> {
    let mut masks = Vec::with_capacity(paths.len());
    let mut axes = None;

    for path in paths {
        let (mask, mask_axes) = loaders::load_mask_csv(path)
            .with_context(|| format!("Failed to load mask: {}", path.display()))?;
        masks.push(mask);
        axes.get_or_insert(mask_axes);
    }

    let axes = axes.context("No masks given")?;
    Ok((masks, axes))
}

fn cmd_threshold(
    sv_file: &Path,
    output: &Path,
    threshold_db: Option<f64>,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();
    let threshold = threshold_db.unwrap_or(config.masks.threshold.threshold_db);

    let grid = load_grid(sv_file)?;
    let mask = masks::threshold_mask(grid.view(), threshold)?;
    write_mask(output, &mask, &grid.axes)?;

    print_summary(
        "Threshold Mask Complete",
        &[
            ("Input file", sv_file.display().to_string()),
            ("Output file", output.display().to_string()),
            ("Grid", format!("{} x {}", grid.num_samples(), grid.num_pings())),
            ("Threshold (dB)", threshold.to_string()),
            ("Signal cells", percent(transforms::mask_coverage(mask.view()))),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_pulse(
    sv_file: &Path,
    output: &Path,
    noise_level_db: Option<f64>,
    fail_on_missing_floor: bool,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();
    let noise_level = noise_level_db.unwrap_or(config.masks.pulse.noise_level_db);
    let policy = if fail_on_missing_floor {
        MissingFloorPolicy::Fail
    } else {
        config.masks.pulse.on_missing_floor
    };

    let grid = load_grid(sv_file)?;
    let pulse = masks::pulse_mask(grid.view(), noise_level, policy)?;
    write_mask(output, &pulse.mask, &grid.axes)?;

    print_summary(
        "Pulse Mask Complete",
        &[
            ("Input file", sv_file.display().to_string()),
            ("Output file", output.display().to_string()),
            ("Grid", format!("{} x {}", grid.num_samples(), grid.num_pings())),
            ("Noise level (dB)", noise_level.to_string()),
            ("Unmasked pings", pulse.unmasked_pings.len().to_string()),
            ("Signal cells", percent(transforms::mask_coverage(pulse.mask.view()))),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_impulse(
    sv_file: &Path,
    output: &Path,
    threshold_db: Option<f64>,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();
    let threshold = threshold_db.unwrap_or(config.masks.impulse.threshold_db);

    let grid = load_grid(sv_file)?;
    let mask = masks::impulse_mask(grid.view(), threshold)?;
    write_mask(output, &mask, &grid.axes)?;

    let spikes = mask.iter().filter(|&&v| v == 0).count();
    print_summary(
        "Impulse Mask Complete",
        &[
            ("Input file", sv_file.display().to_string()),
            ("Output file", output.display().to_string()),
            ("Grid", format!("{} x {}", grid.num_samples(), grid.num_pings())),
            ("Threshold (dB)", threshold.to_string()),
            ("Spikes masked", spikes.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_combine(output: &Path, mask_files: &[PathBuf]) -> Result<()> {
    let start = Instant::now();

    let (mask_list, axes) = load_masks(mask_files)?;
    let flags = masks::combine_masks(&mask_list)?;
    writers::write_grid_csv(output, flags.view(), &axes)
        .with_context(|| format!("Failed to write flag mask: {}", output.display()))?;

    let labels: Vec<String> = mask_files.iter().map(|p| mask_label(p)).collect();
    let count = labels.len();

    println!("Bit order (most significant first): {}", labels.join(", "));
    for value in masks::unique_flags(&flags) {
        let set: Vec<&str> = labels
            .iter()
            .enumerate()
            .filter(|(i, _)| (value >> (count - 1 - i)) & 1 == 1)
            .map(|(_, label)| label.as_str())
            .collect();
        println!(
            "  {:>6}  {}  {}",
            value,
            masks::flag_bits(value, count),
            if set.is_empty() {
                "-".to_string()
            } else {
                set.join(" + ")
            }
        );
    }

    print_summary(
        "Combine Complete",
        &[
            ("Masks", count.to_string()),
            ("Output file", output.display().to_string()),
            ("Distinct values", masks::unique_flags(&flags).len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_presence(output: &Path, mask_files: &[PathBuf]) -> Result<()> {
    let start = Instant::now();

    let (mask_list, axes) = load_masks(mask_files)?;
    let presence = masks::presence_absence(&mask_list)?;
    write_mask(output, &presence, &axes)?;

    print_summary(
        "Presence/Absence Complete",
        &[
            ("Masks", mask_list.len().to_string()),
            ("Output file", output.display().to_string()),
            ("Signal cells", percent(transforms::mask_coverage(presence.view()))),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_run(sv_file: &Path, output_dir: &Path, config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();

    println!("Building mask set...");
    println!("Input: {}", sv_file.display());
    println!("Output directory: {}", output_dir.display());

    let spinner = create_spinner("Generating masks...");
    let outcome = (|| -> Result<_> {
        let grid = load_grid(sv_file)?;
        let set = masks::build_mask_set(&grid, &config.masks)?;
        let flags = set.combine()?;
        Ok((grid, set, flags))
    })();
    spinner.finish_and_clear();
    let (grid, set, flags) = outcome?;

    let mut items = vec![
        ("Input file", sv_file.display().to_string()),
        ("Grid", format!("{} x {}", grid.num_samples(), grid.num_pings())),
    ];

    for named in &set.masks {
        let path = output_dir.join(format!("{}_mask.csv", named.name));
        write_mask(&path, &named.mask, &grid.axes)?;
        info!("Wrote {}", path.display());
        items.push((named.name, percent(transforms::mask_coverage(named.mask.view()))));
    }

    let composite_path = output_dir.join("composite_mask.csv");
    writers::write_grid_csv(&composite_path, flags.view(), &grid.axes)
        .with_context(|| format!("Failed to write flag mask: {}", composite_path.display()))?;

    items.push(("Bit order", set.names().join(", ")));
    items.push(("Unmasked pings", set.unmasked_pings.len().to_string()));
    items.push(("Composite", composite_path.display().to_string()));
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Mask Run Complete", &items);
    Ok(())
}

fn cmd_plot(
    sv_file: &Path,
    output: &Path,
    mask_file: Option<&Path>,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    let grid = load_grid(sv_file)?;
    let mask = match mask_file {
        Some(path) => {
            let (mask, _) = loaders::load_mask_csv(path)
                .with_context(|| format!("Failed to load mask: {}", path.display()))?;
            masks::validate_masks(std::slice::from_ref(&mask))
                .with_context(|| format!("Invalid mask: {}", path.display()))?;
            Some(mask)
        }
        None => None,
    };

    let spinner = create_spinner("Rendering echogram...");
    let outcome = visualization::plot_echogram(
        output,
        grid.view(),
        mask.as_ref().map(|m| m.view()),
        &config.plot,
    );
    spinner.finish_and_clear();
    outcome.with_context(|| format!("Failed to render {}", output.display()))?;

    print_summary(
        "Echogram Complete",
        &[
            ("Input file", sv_file.display().to_string()),
            ("Output PNG", output.display().to_string()),
            (
                "Mask",
                mask_file.map_or_else(|| "none".to_string(), |p| p.display().to_string()),
            ),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_plot_flags(flags_file: &Path, output: &Path, config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();

    let (flags, _) = loaders::load_flag_csv(flags_file)
        .with_context(|| format!("Failed to load flag mask: {}", flags_file.display()))?;

    let spinner = create_spinner("Rendering flag mask...");
    let outcome = visualization::plot_flag_mask(output, flags.view(), &config.plot);
    spinner.finish_and_clear();
    outcome.with_context(|| format!("Failed to render {}", output.display()))?;

    print_summary(
        "Flag Plot Complete",
        &[
            ("Input file", flags_file.display().to_string()),
            ("Output PNG", output.display().to_string()),
            ("Distinct values", masks::unique_flags(&flags).len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}
