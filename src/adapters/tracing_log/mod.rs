// Tracing log adapter - Structured logging using tracing crate

use tracing_subscriber::EnvFilter;

use crate::error::{ServerError, ServerResult};

/// How the global subscriber should be set up
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Fallback filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LogSettings {
    /// Build the env filter: `RUST_LOG` wins, otherwise the configured level
    pub fn env_filter(&self) -> ServerResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| ServerError::Logging {
                message: format!("invalid log level '{}': {}", self.level, e),
            }),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init(settings: &LogSettings) -> ServerResult<()> {
    let filter = settings.env_filter()?;

    let result = if settings.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
