// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_local;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::{EncoderSettings, FFmpegAdapter};
pub use fs_local::{Allocation, ArtifactStore, TRIMMED_ROUTE};
pub use toml_config::{ConfigOverrides, ConfigSources, ServerConfig};
pub use tracing_log::LogSettings;
