// Local filesystem adapter - Artifact store for uploads and trimmed outputs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;

/// Public URL prefix the trimmed directory is served under
pub const TRIMMED_ROUTE: &str = "/trimmed";

/// Hidden name an output is encoded under until it is published. The
/// leading dot keeps it out of the public route.
fn staging_name(identifier: &str) -> String {
    format!(".{}.part", identifier)
}

/// A freshly reserved name inside one of the store directories
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub identifier: String,
    pub path: PathBuf,
}

/// Millisecond tokens that never repeat within the process, even when two
/// requests land in the same millisecond or the wall clock steps back.
#[derive(Debug, Default)]
pub struct NameGenerator {
    last: AtomicI64,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next token: the current time in ms, or one past the last token
    pub fn next_token(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Filesystem-backed store owning the upload and trimmed-output directories
#[derive(Debug)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    trimmed_dir: PathBuf,
    names: NameGenerator,
}

impl ArtifactStore {
    /// Create a store over the given directories. Nothing touches the disk
    /// until [`ArtifactStore::ensure_directories`].
    pub fn new(upload_dir: impl Into<PathBuf>, trimmed_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            trimmed_dir: trimmed_dir.into(),
            names: NameGenerator::new(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn trimmed_dir(&self) -> &Path {
        &self.trimmed_dir
    }

    /// Create both directories if missing. Idempotent.
    pub async fn ensure_directories(&self) -> Result<(), DomainError> {
        for dir in [&self.upload_dir, &self.trimmed_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DomainError::InternalError(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        info!(
            upload_dir = %self.upload_dir.display(),
            trimmed_dir = %self.trimmed_dir.display(),
            "Artifact store directories ready"
        );
        Ok(())
    }

    /// Reserve a fresh path for an upload. Only a known video extension is
    /// taken from `original_name`.
    pub async fn allocate_upload_path(
        &self,
        original_name: Option<&str>,
    ) -> Result<Allocation, DomainError> {
        let extension = ExtensionPolicy::for_upload(original_name);
        self.allocate_in(&self.upload_dir, "", extension).await
    }

    /// Reserve a fresh output path and its public URL
    pub async fn allocate_output_path(&self) -> Result<TrimmedArtifact, DomainError> {
        let allocation = self
            .allocate_in(&self.trimmed_dir, TRIMMED_PREFIX, DEFAULT_VIDEO_EXTENSION)
            .await?;
        Ok(TrimmedArtifact {
            url: format!("{}/{}", TRIMMED_ROUTE, allocation.identifier),
            staging_path: self.trimmed_dir.join(staging_name(&allocation.identifier)),
            identifier: allocation.identifier,
            path: allocation.path,
        })
    }

    async fn allocate_in(
        &self,
        dir: &Path,
        prefix: &str,
        extension: &str,
    ) -> Result<Allocation, DomainError> {
        loop {
            let identifier = format!("{}{}.{}", prefix, self.names.next_token(), extension);
            let path = dir.join(&identifier);
            let taken = tokio::fs::try_exists(&path).await.map_err(|e| {
                DomainError::InternalError(format!(
                    "Failed to check {}: {}",
                    path.display(),
                    e
                ))
            })?;
            // Names left over from an earlier run with a faster clock are skipped
            if !taken {
                debug!(identifier = %identifier, "Allocated artifact name");
                return Ok(Allocation { identifier, path });
            }
        }
    }

    /// Move a verified output from its staging path to its public name
    pub async fn publish(&self, artifact: &TrimmedArtifact) -> Result<(), DomainError> {
        tokio::fs::rename(&artifact.staging_path, &artifact.path)
            .await
            .map_err(|e| {
                DomainError::InternalError(format!(
                    "Failed to publish {}: {}",
                    artifact.identifier, e
                ))
            })?;
        debug!(identifier = %artifact.identifier, "Published artifact");
        Ok(())
    }

    /// Map a client identifier to a stored upload strictly inside the upload
    /// directory.
    pub async fn resolve_source_path(&self, identifier: &str) -> Result<StoredSource, DomainError> {
        IdentifierPolicy::validate(identifier)?;
        let not_found = || DomainError::NotFound("Source video not found".to_string());

        let candidate = self.upload_dir.join(identifier);
        let metadata = match tokio::fs::metadata(&candidate).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(not_found());
        }

        let root = tokio::fs::canonicalize(&self.upload_dir).await?;
        let resolved = tokio::fs::canonicalize(&candidate).await?;
        if resolved.parent() != Some(root.as_path()) {
            warn!(identifier = %identifier, "Identifier resolved outside the upload directory");
            return Err(not_found());
        }

        Ok(StoredSource {
            identifier: identifier.to_string(),
            content_type: ExtensionPolicy::content_type(IdentifierPolicy::extension(identifier))
                .to_string(),
            size_bytes: metadata.len(),
            path: resolved,
        })
    }

    /// Best-effort removal of a partial upload or a failed output
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Discarded artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to discard artifact"),
        }
    }
}
