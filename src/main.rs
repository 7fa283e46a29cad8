// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-paths")]
#[command(about = "Buffer distribution for ISP output paths")]
#[command(version = camera_paths::constants::app_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic pipeline through a path controller and print statistics
    Simulate {
        /// JSON configuration file (default configuration if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of frames to produce per path
        #[arg(short, long, default_value = "120")]
        frames: u64,

        /// Frame rate of the synthetic pipeline (0 = as fast as possible)
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_paths=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            frames,
            fps,
            json,
        } => cli::simulate(config, frames, fps, json),
        Commands::Config => cli::print_default_config(),
    }
}
