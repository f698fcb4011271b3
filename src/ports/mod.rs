// Ports - Interface definitions (contracts)

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// One cut to perform: read `source`, write `window` of it to `output`
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub source: PathBuf,
    pub window: TrimWindow,
    pub output: PathBuf,
}

/// What a finished encode reports back
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    pub output_bytes: u64,
    pub elapsed: Duration,
}

/// Port for video execution (the external encoder)
///
/// Implementations must stop any work they started when the returned future
/// is dropped; the encode pool relies on that to cancel abandoned requests.
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Cut `job.window` out of `job.source` into `job.output`, re-encoding
    /// video and audio.
    async fn encode(&self, job: &EncodeJob) -> Result<EncodeOutcome, DomainError>;
}
