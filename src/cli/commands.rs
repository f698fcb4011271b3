//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::toml_config::ServerConfig;
use crate::app::{AppContainer, DefaultAppContainer};
use crate::http;

/// Execute the serve command
pub async fn serve(config: &ServerConfig) -> Result<()> {
    info!(
        upload_dir = %config.upload_dir.display(),
        trimmed_dir = %config.trimmed_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        ffmpeg = %config.ffmpeg_path.display(),
        "Starting TrimX server"
    );

    let container = DefaultAppContainer::new(config);
    container
        .prepare()
        .await
        .context("Failed to prepare storage directories")?;

    let app = http::router(
        Arc::new(container) as Arc<dyn AppContainer>,
        &config.allowed_origins,
    );
    http::serve(&config.bind_address(), app).await?;
    Ok(())
}

/// Execute the config command
pub fn print_config(config: &ServerConfig) -> Result<()> {
    let rendered = config.to_toml_string()?;
    print!("{}", rendered);
    Ok(())
}
