//! Kinetrace CLI: command-line interface for motion-capture pre-processing.
//!
//! Usage:
//!   kinetrace info <INPUT>                 Show sequence information
//!   kinetrace validate <INPUT>             Check a sequence for common capture defects
//!   kinetrace process <INPUT> -o <OUTPUT>  Run the pre-processing pipeline
//!   kinetrace measure <INPUT> --joint <J>  Print a per-joint measure

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use kinetrace_common::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "kinetrace",
    about = "Pre-processing for motion-capture recordings",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/kinetrace/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sequence information
    Info {
        /// Sequence file (JSON)
        input: PathBuf,
    },

    /// Check a sequence for dropouts, variable rate, and velocity spikes
    Validate {
        /// Sequence file (JSON)
        input: PathBuf,
    },

    /// Run the pre-processing pipeline and save the result
    Process {
        /// Sequence file (JSON)
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Name of the processed sequence
        #[arg(long)]
        name: Option<String>,

        /// Refill joints reported at the origin
        #[arg(long)]
        correct_zeros: bool,

        /// Reference joint label, or "auto" for SpineMid/Chest
        #[arg(long)]
        re_reference: Option<String>,

        /// Keep the reference joint at its initial position instead of the origin
        #[arg(long)]
        keep_reference_position: bool,

        /// Trim start (seconds, relative to the first pose)
        #[arg(long)]
        trim_start: Option<f64>,

        /// Trim end (seconds, relative to the first pose)
        #[arg(long)]
        trim_end: Option<f64>,

        /// Delay between the first pose and the start of the audio (seconds)
        #[arg(long, requires = "trim_audio_duration")]
        trim_audio_delay: Option<f64>,

        /// Audio duration (seconds)
        #[arg(long, requires = "trim_audio_delay")]
        trim_audio_duration: Option<f64>,

        /// Velocity threshold enabling jitter correction (distance unit per second)
        #[arg(long)]
        jitter_threshold: Option<f64>,

        /// Jitter window: a pose count ("3") or a duration ("100ms", "0.1s")
        #[arg(long)]
        jitter_window: Option<String>,

        /// Jitter interpolation: default|linear|cubic|pchip|nearest
        #[arg(long)]
        jitter_method: Option<String>,

        /// Remove frequencies below this value (Hz)
        #[arg(long)]
        filter_below: Option<f64>,

        /// Remove frequencies above this value (Hz)
        #[arg(long)]
        filter_over: Option<f64>,

        /// Resample to this frequency (Hz)
        #[arg(long)]
        resample: Option<f64>,

        /// Resampling interpolation: linear|cubic|pchip|nearest
        #[arg(long)]
        resample_method: Option<String>,

        /// Input samples per resampling window
        #[arg(long)]
        resample_window: Option<usize>,
    },

    /// Print a measure for one joint
    Measure {
        /// Sequence file (JSON)
        input: PathBuf,

        /// Joint label
        #[arg(short, long)]
        joint: String,

        /// x|y|z|distance|distance_x|distance_y|distance_z|velocity|acceleration
        #[arg(short, long, default_value = "velocity")]
        measure: String,

        /// Print JSON instead of one value per line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    kinetrace_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Info { input } => commands::info::run(input),
        Commands::Validate { input } => commands::validate::run(input, &config),
        Commands::Process {
            input,
            output,
            name,
            correct_zeros,
            re_reference,
            keep_reference_position,
            trim_start,
            trim_end,
            trim_audio_delay,
            trim_audio_duration,
            jitter_threshold,
            jitter_window,
            jitter_method,
            filter_below,
            filter_over,
            resample,
            resample_method,
            resample_window,
        } => commands::process::run(
            input,
            output,
            commands::process::Pipeline {
                name,
                correct_zeros,
                re_reference,
                place_at_zero: !keep_reference_position,
                trim_start,
                trim_end,
                trim_audio: trim_audio_delay.zip(trim_audio_duration),
                jitter_threshold,
                jitter_window,
                jitter_method,
                filter_below,
                filter_over,
                resample,
                resample_method,
                resample_window,
            },
            &config,
        ),
        Commands::Measure {
            input,
            joint,
            measure,
            json,
        } => commands::measure::run(input, joint, measure, json),
    }
}
