// TOML config adapter - Server configuration with layered overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::exec_ffmpeg::EncoderSettings;
use crate::error::{ServerError, ServerResult};

/// Files probed, in order, when no `--config` is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "config/production.toml",
    "config/development.toml",
    "trimx_server.toml",
];

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Effective server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub trimmed_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub allowed_origins: Vec<String>,
    pub ffmpeg_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
    pub max_concurrent_encodes: usize,
    pub encode_queue_capacity: usize,
    pub encode_timeout_secs: Option<u64>,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let encoder = EncoderSettings::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            trimmed_dir: PathBuf::from("trimmed"),
            max_upload_bytes: 500 * 1024 * 1024,
            allowed_origins: vec!["*".to_string()],
            ffmpeg_path: encoder.ffmpeg_path,
            video_codec: encoder.video_codec,
            audio_codec: encoder.audio_codec,
            preset: encoder.preset,
            crf: encoder.crf,
            max_concurrent_encodes: num_cpus::get().max(1),
            encode_queue_capacity: 32,
            encode_timeout_secs: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// On-disk layout: everything lives under `[server]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
}

/// Where the effective configuration came from. Loading happens before the
/// subscriber is installed, so this is logged afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSources {
    pub file: Option<PathBuf>,
    pub env_keys: Vec<String>,
}

impl ConfigSources {
    pub fn log(&self) {
        match &self.file {
            Some(path) => info!(path = %path.display(), "Loaded configuration file"),
            None => info!("No configuration file found, using defaults"),
        }
        if !self.env_keys.is_empty() {
            info!(keys = ?self.env_keys, "Applied environment variable overrides");
        }
    }
}

/// Overrides collected from the command line; `None` leaves a value alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upload_dir: Option<PathBuf>,
    pub trimmed_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<u64>,
    pub allowed_origins: Vec<String>,
    pub ffmpeg_path: Option<PathBuf>,
    pub max_concurrent_encodes: Option<usize>,
    pub encode_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

impl ServerConfig {
    /// Resolve configuration following precedence: CLI > Env > File > Defaults
    pub fn load(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> ServerResult<(Self, ConfigSources)> {
        let file = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => DEFAULT_CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };
        let mut config = match &file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let env_keys = config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok((config, ConfigSources { file, env_keys }))
    }

    /// Load a TOML file on top of the defaults
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| ServerError::Config {
            message: format!("{} ({})", e, path.display()),
        })?;
        Ok(config)
    }

    /// Parse TOML content with a `[server]` table
    pub fn from_toml_str(content: &str) -> ServerResult<Self> {
        let parsed: ConfigFile = toml::from_str(content).map_err(|e| ServerError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        Ok(parsed.server)
    }

    /// Render as the TOML a config file would contain
    pub fn to_toml_string(&self) -> ServerResult<String> {
        #[derive(Serialize)]
        struct Wrapper<'a> {
            server: &'a ServerConfig,
        }
        toml::to_string(&Wrapper { server: self }).map_err(|e| ServerError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }

    /// Apply environment overrides read through `lookup`, returning the keys
    /// that were set
    pub fn apply_env<F>(&mut self, lookup: F) -> ServerResult<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        let mut read = |key: &str| {
            let value = lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
            if value.is_some() {
                applied.push(key.to_string());
            }
            value
        };

        if let Some(v) = read("TRIMX_HOST") {
            self.host = v;
        }
        // The bare PORT variable is what most hosting platforms set
        if let Some(v) = read("PORT") {
            self.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = read("TRIMX_PORT") {
            self.port = parse_env("TRIMX_PORT", &v)?;
        }
        if let Some(v) = read("TRIMX_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = read("TRIMX_TRIMMED_DIR") {
            self.trimmed_dir = PathBuf::from(v);
        }
        if let Some(v) = read("TRIMX_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_env("TRIMX_MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = read("TRIMX_ALLOWED_ORIGINS") {
            self.allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = read("TRIMX_FFMPEG_PATH") {
            self.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = read("TRIMX_VIDEO_CODEC") {
            self.video_codec = v;
        }
        if let Some(v) = read("TRIMX_AUDIO_CODEC") {
            self.audio_codec = v;
        }
        if let Some(v) = read("TRIMX_PRESET") {
            self.preset = v;
        }
        if let Some(v) = read("TRIMX_CRF") {
            self.crf = parse_env("TRIMX_CRF", &v)?;
        }
        if let Some(v) = read("TRIMX_MAX_CONCURRENT_ENCODES") {
            self.max_concurrent_encodes = parse_env("TRIMX_MAX_CONCURRENT_ENCODES", &v)?;
        }
        if let Some(v) = read("TRIMX_ENCODE_QUEUE_CAPACITY") {
            self.encode_queue_capacity = parse_env("TRIMX_ENCODE_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = read("TRIMX_ENCODE_TIMEOUT_SECS") {
            self.encode_timeout_secs = Some(parse_env("TRIMX_ENCODE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = read("TRIMX_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = read("TRIMX_JSON_LOGS") {
            self.json_logs = parse_env("TRIMX_JSON_LOGS", &v)?;
        }

        Ok(applied)
    }

    /// Apply CLI argument overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dir) = &overrides.upload_dir {
            self.upload_dir = dir.clone();
        }
        if let Some(dir) = &overrides.trimmed_dir {
            self.trimmed_dir = dir.clone();
        }
        if let Some(limit) = overrides.max_upload_bytes {
            self.max_upload_bytes = limit;
        }
        if !overrides.allowed_origins.is_empty() {
            self.allowed_origins = overrides.allowed_origins.clone();
        }
        if let Some(path) = &overrides.ffmpeg_path {
            self.ffmpeg_path = path.clone();
        }
        if let Some(workers) = overrides.max_concurrent_encodes {
            self.max_concurrent_encodes = workers;
        }
        if let Some(timeout) = overrides.encode_timeout_secs {
            self.encode_timeout_secs = Some(timeout);
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        if overrides.json_logs {
            self.json_logs = true;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ServerResult<()> {
        let invalid = |message: String| Err(ServerError::Config { message });

        if self.port == 0 {
            return invalid("port must be between 1 and 65535".to_string());
        }
        if self.max_upload_bytes == 0 {
            return invalid("max_upload_bytes must be positive".to_string());
        }
        if self.allowed_origins.is_empty() {
            return invalid("allowed_origins cannot be empty (use \"*\" to allow any)".to_string());
        }
        if self.ffmpeg_path.as_os_str().is_empty() {
            return invalid("ffmpeg_path cannot be empty".to_string());
        }
        if self.crf > 51 {
            return invalid("CRF value cannot exceed 51".to_string());
        }
        if self.max_concurrent_encodes == 0 {
            return invalid("max_concurrent_encodes must be at least 1".to_string());
        }
        if self.encode_queue_capacity == 0 {
            return invalid("encode_queue_capacity must be at least 1".to_string());
        }
        if self.encode_timeout_secs == Some(0) {
            return invalid("encode_timeout_secs must be positive when set".to_string());
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return invalid(format!(
                "Invalid log level: {}. Valid levels: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }

    /// Encoder settings derived from this configuration
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            ffmpeg_path: self.ffmpeg_path.clone(),
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            preset: self.preset.clone(),
            crf: self.crf,
        }
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(key: &str, value: &str) -> ServerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ServerError::Config {
        message: format!("Invalid value for {}: {} ({})", key, value, e),
    })
}
