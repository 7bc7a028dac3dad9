use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use climbrs::error::ClimbRsError;
use climbrs::export::{self, ExportFormat};
use climbrs::logging::init_logging;
use climbrs::pacing::PowerOverride;
use climbrs::physics::{PhysicsSolver, SolveOutcome, SolveRequest};
use climbrs::route::RoutePreprocessor;
use climbrs::segmentation::{MergeStrategy, Segmenter};
use climbrs::{AppConfig, DraftingRegime, ImportManager, StageAnalyzer};

/// climbrs - Climbing stage analysis CLI
///
/// Splits a GPS route into climbing segments, assigns drafting regimes,
/// predicts segment durations from rider power and tracks glycogen depletion.
#[derive(Parser)]
#[command(name = "climbrs")]
#[command(version)]
#[command(about = "Climbing stage analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full stage analysis on a route file
    Analyze {
        /// Route file (GPX or CSV)
        route: PathBuf,

        /// Output format (table, json, csv); guessed from --output when omitted
        #[arg(short = 'f', long)]
        format: Option<ExportFormat>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum segment length in km
        #[arg(long)]
        min_length: Option<f64>,

        /// Minimum slope difference (%) keeping neighbours apart
        #[arg(long)]
        min_slope_diff: Option<f64>,

        /// Rider mass in kg
        #[arg(long)]
        mass: Option<f64>,

        /// Merge until no neighbouring pair is similar
        #[arg(long)]
        fixed_point: bool,

        /// Relative power for one segment, numbered from 1 (repeatable)
        #[arg(long = "power", value_name = "SEGMENT=W/KG")]
        power: Vec<PowerOverride>,
    },

    /// Segment a route without running physics
    Segments {
        /// Route file (GPX or CSV)
        route: PathBuf,

        /// Minimum segment length in km
        #[arg(long)]
        min_length: Option<f64>,
    },

    /// Solve one climb for power or duration
    Solve {
        /// Segment distance in km
        #[arg(long)]
        distance_km: f64,

        /// Elevation gain in m
        #[arg(long)]
        gain_m: f64,

        /// Target duration in seconds
        #[arg(long, conflicts_with = "power")]
        duration_s: Option<f64>,

        /// Relative power in W/kg
        #[arg(long)]
        power: Option<f64>,

        /// Drafting regime
        #[arg(long, value_enum, default_value_t = Regime::NoDraft)]
        regime: Regime,
    },

    /// Create or show the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the active configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Regime {
    FullDraft,
    SemiDraft,
    NoDraft,
}

impl From<Regime> for DraftingRegime {
    fn from(regime: Regime) -> Self {
        match regime {
            Regime::FullDraft => DraftingRegime::FullDraft,
            Regime::SemiDraft => DraftingRegime::SemiDraft,
            Regime::NoDraft => DraftingRegime::NoDraft,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ClimbRsError>() {
            Some(err) => {
                if err.severity().to_tracing_level() == tracing::Level::ERROR {
                    tracing::error!(severity = ?err.severity(), error = %err, "Command failed");
                } else {
                    tracing::warn!(severity = ?err.severity(), error = %err, "Command failed");
                }
                eprintln!("{} {}", "Error:".red().bold(), err.user_message());
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = if cli.config.is_some() {
        AppConfig::load_from_file(&config_path)?
    } else {
        AppConfig::load_or_default()
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Analyze {
            route,
            format,
            output,
            min_length,
            min_slope_diff,
            mass,
            fixed_point,
            power,
        } => {
            if let Some(value) = min_length {
                config.segmentation.min_length_km = value;
            }
            if let Some(value) = min_slope_diff {
                config.segmentation.min_slope_diff = value;
            }
            if let Some(value) = mass {
                config.rider.mass_kg = value;
            }
            if fixed_point {
                config.segmentation.merge_strategy = MergeStrategy::FixedPoint;
            }
            for entry in power {
                config.pacing.set_override(entry);
            }
            config.validate().map_err(ClimbRsError::from)?;

            let route = ImportManager::new(RoutePreprocessor::default()).import_file(&route)?;
            let plan = StageAnalyzer::new(config.analysis_config()).analyze(&route)?;

            let format = format
                .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
                .unwrap_or_default();
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    export::write_plan(&plan, format, BufWriter::new(file))?;
                    println!(
                        "{} {} segments written to {}",
                        "✓".green(),
                        plan.summary.segment_count,
                        path.display()
                    );
                }
                None => export::write_plan(&plan, format, io::stdout().lock())?,
            }
        }

        Commands::Segments { route, min_length } => {
            if let Some(value) = min_length {
                config.segmentation.min_length_km = value;
            }
            let route = ImportManager::new(RoutePreprocessor::default()).import_file(&route)?;
            let segmentation = Segmenter::new(config.segmentation.clone())
                .segment(&route)
                .map_err(ClimbRsError::from)?;

            println!(
                "{} {} inflection points, {} raw segments, {} after merging",
                "Segmentation:".blue().bold(),
                segmentation.inflection_points.len(),
                segmentation.raw_segments.len(),
                segmentation.segments.len()
            );
            println!(
                "{}",
                export::text::render_segments(&route, &segmentation.segments)
            );
        }

        Commands::Solve {
            distance_km,
            gain_m,
            duration_s,
            power,
            regime,
        } => {
            let solver = PhysicsSolver::new(config.solver);
            let request = SolveRequest {
                duration_s,
                relative_power: power,
                distance_km,
                elevation_gain_m: gain_m,
                drafting: regime.into(),
            };
            let outcome = solver
                .solve(&request, &config.rider.to_profile())
                .map_err(ClimbRsError::from)?;

            match outcome {
                SolveOutcome::RelativePower(value) => {
                    println!("{} {:.2} W/kg", "Relative power:".green().bold(), value)
                }
                SolveOutcome::Duration(value) => println!(
                    "{} {} ({:.0} s)",
                    "Duration:".green().bold(),
                    export::text::format_duration(value),
                    value
                ),
            }
        }

        Commands::Config { init, show } => {
            if init {
                write_default_config(&config_path)?;
            }
            if show || !init {
                let rendered = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                println!("{}", format!("# {}", config_path.display()).dimmed());
                println!("{}", rendered);
            }
        }
    }

    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!(
            "{} {} already exists, leaving it unchanged",
            "!".yellow(),
            path.display()
        );
        return Ok(());
    }
    AppConfig::default().save_to_file(path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}
