//! CLI module for the TrimX server
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// TrimX video trimming server
///
/// Accepts video uploads over HTTP, cuts time windows out of them with
/// ffmpeg and serves the resulting clips.
#[derive(Parser, Debug)]
#[command(name = "trimx-server")]
#[command(about = "TrimX video trimming server - upload, trim and serve clips over HTTP")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub server: args::ServerArgs,

    /// The command to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server
    Serve,
    /// Print the effective configuration as TOML and exit
    Config,
}

impl Cli {
    pub fn selected_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}
