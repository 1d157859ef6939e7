//! Watchtower daemon entry point.

use clap::Parser;

use watchtower::cli::{commands, handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Run => commands::run::execute(config_path).await,
        Commands::Config { json } => commands::config::execute(config_path, json),
    };

    if let Err(err) = result {
        handle_error(err);
    }
}
