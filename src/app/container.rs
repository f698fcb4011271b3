use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{ArtifactStore, FFmpegAdapter, ServerConfig};
use crate::app::{trim_interactor::TrimInteractor, upload_interactor::UploadInteractor};
use crate::domain::errors::DomainError;
use crate::engine::{EncodePool, PoolSettings};
use crate::ports::ExecutePort;

pub trait AppContainer: Send + Sync {
    fn upload_interactor(&self) -> Arc<UploadInteractor>;
    fn trim_interactor(&self) -> Arc<TrimInteractor>;
    fn artifact_store(&self) -> Arc<ArtifactStore>;
}

pub struct DefaultAppContainer {
    store: Arc<ArtifactStore>,
    upload_interactor: Arc<UploadInteractor>,
    trim_interactor: Arc<TrimInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production graph: local store, ffmpeg encoder, encode pool.
    /// Spawns pool workers, so it must run inside a tokio runtime.
    pub fn new(config: &ServerConfig) -> Self {
        let encoder = Arc::new(FFmpegAdapter::new(config.encoder_settings()));
        Self::with_encoder(config, encoder)
    }

    /// Same graph with a caller-supplied encoder
    pub fn with_encoder(config: &ServerConfig, encoder: Arc<dyn ExecutePort>) -> Self {
        let store = Arc::new(ArtifactStore::new(
            config.upload_dir.clone(),
            config.trimmed_dir.clone(),
        ));

        let pool = Arc::new(EncodePool::new(
            encoder,
            PoolSettings {
                workers: config.max_concurrent_encodes,
                queue_capacity: config.encode_queue_capacity,
                timeout: config.encode_timeout_secs.map(Duration::from_secs),
            },
        ));

        let upload_interactor = Arc::new(UploadInteractor::new(
            Arc::clone(&store),
            config.max_upload_bytes,
        ));
        let trim_interactor = Arc::new(TrimInteractor::new(Arc::clone(&store), pool));

        Self {
            store,
            upload_interactor,
            trim_interactor,
        }
    }

    /// Create storage directories; the server must not start without them
    pub async fn prepare(&self) -> Result<(), DomainError> {
        self.store.ensure_directories().await
    }
}

impl AppContainer for DefaultAppContainer {
    fn upload_interactor(&self) -> Arc<UploadInteractor> {
        Arc::clone(&self.upload_interactor)
    }

    fn trim_interactor(&self) -> Arc<TrimInteractor> {
        Arc::clone(&self.trim_interactor)
    }

    fn artifact_store(&self) -> Arc<ArtifactStore> {
        Arc::clone(&self.store)
    }
}
