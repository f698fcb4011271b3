//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::adapters::toml_config::ConfigOverrides;

/// Flags accepted by every command; each one overrides the config file and
/// the environment
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Configuration file (TOML, keys under [server])
    #[arg(long, env = "TRIMX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Address to bind
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Directory for uploaded sources
    #[arg(long, global = true)]
    pub upload_dir: Option<PathBuf>,

    /// Directory for trimmed outputs, served under /trimmed
    #[arg(long, global = true)]
    pub trimmed_dir: Option<PathBuf>,

    /// Largest accepted upload in bytes
    #[arg(long, global = true)]
    pub max_upload_bytes: Option<u64>,

    /// Allowed CORS origin, repeatable ("*" allows any)
    #[arg(long = "allowed-origin", global = true)]
    pub allowed_origins: Vec<String>,

    /// Path to the ffmpeg binary
    #[arg(long = "ffmpeg", global = true)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Encodes allowed to run at once
    #[arg(long, global = true)]
    pub max_concurrent_encodes: Option<usize>,

    /// Kill encodes that run longer than this many seconds
    #[arg(long, global = true)]
    pub encode_timeout_secs: Option<u64>,
}

impl ServerArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            upload_dir: self.upload_dir.clone(),
            trimmed_dir: self.trimmed_dir.clone(),
            max_upload_bytes: self.max_upload_bytes,
            allowed_origins: self.allowed_origins.clone(),
            ffmpeg_path: self.ffmpeg_path.clone(),
            max_concurrent_encodes: self.max_concurrent_encodes,
            encode_timeout_secs: self.encode_timeout_secs,
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
        }
    }
}
