// Trim interactor - Orchestrates cutting a stored source into a new artifact

use std::sync::Arc;

use tracing::{error, info};

use crate::adapters::fs_local::ArtifactStore;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::EncodePool;
use crate::ports::*;

/// Interactor for the trim use case
pub struct TrimInteractor {
    store: Arc<ArtifactStore>,
    pool: Arc<EncodePool>,
}

impl TrimInteractor {
    /// Create new trim interactor
    pub fn new(store: Arc<ArtifactStore>, pool: Arc<EncodePool>) -> Self {
        Self { store, pool }
    }

    /// Cut `request.window` out of the named upload.
    ///
    /// The encoder writes to a hidden staging path that is renamed to the
    /// public name only after it succeeds. On any failure the staged file is
    /// removed, so a URL is only ever returned for a complete file.
    pub async fn trim(&self, request: TrimRequest) -> Result<TrimmedArtifact, DomainError> {
        let source = self.store.resolve_source_path(&request.identifier).await?;
        let artifact = self.store.allocate_output_path().await?;

        info!(
            source = %source.identifier,
            output = %artifact.identifier,
            window = %request.window,
            duration_secs = request.window.duration().seconds,
            "Trim requested"
        );

        let job = EncodeJob {
            source: source.path.clone(),
            window: request.window,
            output: artifact.staging_path.clone(),
        };

        let published = match self.pool.submit(job).await {
            Ok(outcome) => self.store.publish(&artifact).await.map(|()| outcome),
            Err(e) => Err(e),
        };

        match published {
            Ok(outcome) => {
                info!(
                    source = %source.identifier,
                    output = %artifact.identifier,
                    output_bytes = outcome.output_bytes,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Trim completed"
                );
                Ok(artifact)
            }
            Err(e) => {
                if let DomainError::EncodingFailed { message, diagnostics } = &e {
                    error!(
                        source = %source.identifier,
                        message = %message,
                        diagnostics = %diagnostics,
                        "Trim failed"
                    );
                }
                self.store.discard(&artifact.staging_path).await;
                Err(e)
            }
        }
    }
}
