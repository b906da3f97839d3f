//! Signpose CLI: landmark series extraction and rendering.
//!
//! Usage:
//!   signpose extract --input <VIDEO> --out-dir <DIR>       Extract one video
//!   signpose extract --manifest <CSV> --videos-dir <DIR> --out-dir <DIR>
//!                                                          Extract a batch
//!   signpose render --input <NPZ> --output <VIDEO>         Render a series
//!   signpose info <NPZ>                                    Show series information
//!   signpose check                                         Check external tools

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use signpose_common::config::{config_file_path, AppConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "signpose",
    about = "Body, hand, and face landmark time series from sign language video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $SIGNPOSE_CONFIG or the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract landmark series from one video or a manifest of videos
    #[command(group(ArgGroup::new("source").required(true).args(["input", "manifest"])))]
    Extract {
        /// Single video to extract
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// CSV manifest with a `uid` column
        #[arg(short, long, requires = "videos_dir")]
        manifest: Option<PathBuf>,

        /// Directory holding `<uid>.mp4` files for manifest runs
        #[arg(long)]
        videos_dir: Option<PathBuf>,

        /// Output directory for `.npz` bundles
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Target sampling rate (frames per second)
        #[arg(long)]
        fps: Option<f64>,

        /// Stop after this many sampled frames per video (0 means no limit)
        #[arg(long)]
        max_frames: Option<usize>,
    },

    /// Render a landmark series to a video
    Render {
        /// Input `.npz` bundle
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Output frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Output width (must be even)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (must be even)
        #[arg(long)]
        height: Option<u32>,

        /// Draw pose and hand skeleton lines
        #[arg(long)]
        draw_connections: bool,

        /// Hide groups that were not detected in a frame
        #[arg(long)]
        skip_undetected: bool,
    },

    /// Show series information
    Info {
        /// Path to the `.npz` bundle
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check external tools and detector configuration
    Check,
}

/// The config file this run reads: `--config`, else the default location.
fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(config_file_path)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.clone());
    let config = AppConfig::load_from(&config_path);
    signpose_common::logging::init_cli_logging(&config.logging, cli.verbose);

    match cli.command {
        Commands::Extract {
            input,
            manifest,
            videos_dir,
            out_dir,
            fps,
            max_frames,
        } => {
            let args = commands::extract::ExtractArgs {
                input,
                manifest,
                videos_dir,
                out_dir,
                fps,
                max_frames,
            };
            commands::extract::run(&config, args)
        }
        Commands::Render {
            input,
            output,
            fps,
            width,
            height,
            draw_connections,
            skip_undetected,
        } => {
            let args = commands::render::RenderArgs {
                input,
                output,
                fps,
                width,
                height,
                draw_connections,
                skip_undetected,
            };
            commands::render::run(&config, args)
        }
        Commands::Info { path, json } => commands::info::run(path, json),
        Commands::Check => commands::check::run(&config, &config_path),
    }
}
