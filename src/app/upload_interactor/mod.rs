// Upload interactor - Orchestrates streaming an upload into the artifact store

use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::adapters::fs_local::{Allocation, ArtifactStore};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;

/// Interactor for the upload use case
pub struct UploadInteractor {
    store: Arc<ArtifactStore>,
    max_upload_bytes: u64,
}

impl UploadInteractor {
    /// Create new upload interactor
    pub fn new(store: Arc<ArtifactStore>, max_upload_bytes: u64) -> Self {
        Self {
            store,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Reserve a fresh upload name and open it for streaming.
    ///
    /// Bytes are written as they arrive; nothing is buffered whole in memory.
    pub async fn begin(&self, original_name: Option<&str>) -> Result<UploadSink, DomainError> {
        let allocation = self.store.allocate_upload_path(original_name).await?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&allocation.path)
            .await
            .map_err(|e| {
                DomainError::InternalError(format!(
                    "Failed to create upload file {}: {}",
                    allocation.path.display(),
                    e
                ))
            })?;

        debug!(
            identifier = %allocation.identifier,
            original_name = original_name.unwrap_or(""),
            "Upload started"
        );

        Ok(UploadSink {
            store: Arc::clone(&self.store),
            allocation,
            writer: BufWriter::new(file),
            limit: self.max_upload_bytes,
            written: 0,
            finished: false,
        })
    }
}

/// An upload in progress. Either [`UploadSink::commit`] or
/// [`UploadSink::abort`] it; a sink dropped half-way removes its file.
pub struct UploadSink {
    store: Arc<ArtifactStore>,
    allocation: Allocation,
    writer: BufWriter<File>,
    limit: u64,
    written: u64,
    finished: bool,
}

impl UploadSink {
    pub fn identifier(&self) -> &str {
        &self.allocation.identifier
    }

    /// Append a chunk, failing once the upload would pass the size limit
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), DomainError> {
        let total = self.written + chunk.len() as u64;
        if total > self.limit {
            return Err(DomainError::PayloadTooLarge {
                limit_bytes: self.limit,
            });
        }
        self.writer.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    /// Flush to disk and hand back the stored source
    pub async fn commit(mut self) -> Result<StoredSource, DomainError> {
        if self.written == 0 {
            self.abort().await;
            return Err(DomainError::BadRequest("Uploaded file is empty".to_string()));
        }

        if let Err(e) = self.flush().await {
            self.abort().await;
            return Err(e);
        }
        self.finished = true;

        info!(
            identifier = %self.allocation.identifier,
            size_bytes = self.written,
            "Upload stored"
        );

        Ok(StoredSource {
            identifier: self.allocation.identifier.clone(),
            path: self.allocation.path.clone(),
            size_bytes: self.written,
            content_type: ExtensionPolicy::content_type(IdentifierPolicy::extension(
                &self.allocation.identifier,
            ))
            .to_string(),
        })
    }

    /// Drop the partial file
    pub async fn abort(mut self) {
        self.finished = true;
        // Close the handle first so removal also works where open files are locked
        let _ = self.writer.shutdown().await;
        self.store.discard(&self.allocation.path).await;
        debug!(identifier = %self.allocation.identifier, "Upload aborted");
    }

    async fn flush(&mut self) -> Result<(), DomainError> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await?;
        Ok(())
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        if !self.finished {
            warn!(identifier = %self.allocation.identifier, "Upload interrupted, removing partial file");
            let _ = std::fs::remove_file(&self.allocation.path);
        }
    }
}
