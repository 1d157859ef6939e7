//! Command-line interface
//!
//! `watchtower [--config <path>] <command>`

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "watchtower")]
#[command(about = "Rocket Pool trusted-node watchtower", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./watchtower.yaml when present)
    #[arg(short, long, global = true, env = "WATCHTOWER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the watchtower daemon until interrupted
    Run,

    /// Print the effective configuration
    Config {
        /// Output JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

/// Print an error with its cause chain and exit non-zero
pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("Error: {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  Caused by: {cause}");
    }
    std::process::exit(1);
}
