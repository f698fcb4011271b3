//! TrimX video trimming server
//!
//! Accepts video uploads over HTTP, re-encodes requested time windows with
//! ffmpeg and serves the resulting clips from `/trimmed`.
//!
//! # Usage
//!
//! ```bash
//! trimx-server --port 5000 --upload-dir uploads --trimmed-dir trimmed
//! trimx-server config --config trimx_server.toml
//! ```

use anyhow::Result;
use clap::Parser;

use trimx_server::adapters::toml_config::ServerConfig;
use trimx_server::adapters::tracing_log::{self, LogSettings};
use trimx_server::cli::{commands, Cli, Commands};

/// Main entry point for the TrimX server
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, sources) =
        ServerConfig::load(cli.server.config.as_deref(), &cli.server.to_overrides())?;

    match cli.selected_command() {
        Commands::Config => commands::print_config(&config),
        Commands::Serve => {
            tracing_log::init(&LogSettings {
                level: config.log_level.clone(),
                json: config.json_logs,
            })?;
            sources.log();
            commands::serve(&config).await
        }
    }
}
