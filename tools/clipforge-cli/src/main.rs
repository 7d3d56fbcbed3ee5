//! Clipforge CLI: speed up videos and composite overlays with ffmpeg.
//!
//! Usage:
//!   clipforge apply <SOURCES>...   Process one or more local videos
//!   clipforge plan --duration S    Print the filter graph for a clip length
//!   clipforge fetch <URL>          Download a source video with yt-dlp
//!   clipforge check                Check external tool availability
//!   clipforge init-config          Write the default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipforge_common::config::AppConfig;

mod commands;

use commands::OverlayArgs;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Speed up videos and composite overlays through ffmpeg filter graphs",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/clipforge/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process local videos
    Apply {
        /// Source video files
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        #[command(flatten)]
        overlay: OverlayArgs,

        /// Output file path (single source only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suffix appended to the source name when deriving the output path
        #[arg(long)]
        suffix: Option<String>,

        /// Keep the source file after a successful run
        #[arg(long)]
        keep_source: bool,

        /// Encoder profile: cpu|nvenc
        #[arg(long)]
        encoder: Option<String>,

        /// Maximum number of sources processed at once
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Write the compiled filter graph as JSON next to each output
        #[arg(long)]
        graph_report: bool,
    },

    /// Print the filter graph for a clip without running ffmpeg
    Plan {
        /// Source duration in seconds
        #[arg(long)]
        duration: f64,

        #[command(flatten)]
        overlay: OverlayArgs,

        /// Print the graph as JSON instead of the -filter_complex string
        #[arg(long)]
        json: bool,
    },

    /// Download a source video
    Fetch {
        /// Video URL
        url: String,

        /// Destination directory
        #[arg(short, long, default_value = "videos")]
        output: PathBuf,
    },

    /// Check that ffmpeg, ffprobe and yt-dlp are installed
    Check,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = match (&cli.config, &cli.command) {
        (_, Commands::InitConfig { .. }) => AppConfig::default(),
        (Some(path), _) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        (None, _) => AppConfig::load(),
    };

    let mut logging = app_config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Apply {
            sources,
            overlay,
            output,
            suffix,
            keep_source,
            encoder,
            jobs,
            graph_report,
        } => {
            commands::apply::run(
                &app_config,
                sources,
                overlay,
                commands::apply::OutputOptions {
                    output,
                    suffix,
                    keep_source,
                    encoder,
                    graph_report,
                },
                jobs,
            )
            .await
        }
        Commands::Plan {
            duration,
            overlay,
            json,
        } => commands::plan::run(&app_config, duration, overlay, json),
        Commands::Fetch { url, output } => commands::fetch::run(url, output).await,
        Commands::Check => commands::check::run(&app_config),
        Commands::InitConfig { force } => commands::init_config::run(cli.config, force),
    }
}
