use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use gpxstats::SmoothingConfig;
use gpxstats::units::UnitSystem;
use std::error::Error;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands {
    pub mod input;
    pub mod summary;
    pub mod track;
}

use commands::summary::summary_command;
use commands::track::track_command;

#[derive(Parser)]
#[command(
    name = "gpxstats",
    version,
    about = "Distance, speed and elevation statistics for GPX tracks"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Summarize one or more GPX files (reads stdin when no file is given)")]
    Summary {
        files: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,

        /// Report miles, feet and mph
        #[arg(long)]
        imperial: bool,

        #[command(flatten)]
        smoothing: SmoothingArgs,
    },
    #[command(about = "Print the parsed track points and their endpoints")]
    Track {
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct SmoothingArgs {
    /// Smooth elevations before summing gain
    #[arg(
        long,
        env = "ELEVATION_SMOOTHING_ENABLED",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        value_name = "BOOL"
    )]
    smoothing: bool,

    /// Shorthand for `--smoothing false`
    #[arg(long)]
    no_smoothing: bool,

    /// Moving-average width in points (values below 1 use 3)
    #[arg(
        long,
        env = "ELEVATION_SMOOTHING_WINDOW",
        default_value_t = SmoothingConfig::default().window,
        allow_negative_numbers = true
    )]
    smoothing_window: i64,

    /// Smoothed steps at or below this many meters are ignored
    #[arg(
        long,
        env = "ELEVATION_MIN_GAIN",
        default_value_t = SmoothingConfig::default().min_gain_m,
        value_parser = parse_min_gain
    )]
    min_gain: f64,
}

impl SmoothingArgs {
    fn to_config(&self) -> SmoothingConfig {
        SmoothingConfig {
            enabled: self.smoothing && !self.no_smoothing,
            window: self.smoothing_window,
            min_gain_m: self.min_gain,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn parse_min_gain(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("minimum gain must be a non-negative number, got {s}"))
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Summary {
            files,
            format,
            imperial,
            smoothing,
        } => {
            let units = if imperial {
                UnitSystem::Imperial
            } else {
                UnitSystem::Metric
            };
            summary_command(&files, &smoothing.to_config(), format, units)
        }
        Commands::Track { file, format } => track_command(file.as_deref(), format),
    }
}
