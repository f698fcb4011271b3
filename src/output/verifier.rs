//! Output verification implementation

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;

/// Offset and tag of the box every ISO-BMFF (MP4) file starts with
const FTYP_OFFSET: usize = 4;
const FTYP_TAG: &[u8; 4] = b"ftyp";

/// Result of checking a freshly encoded clip
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub file_size: u64,
    pub has_container_header: bool,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        self.file_size > 0 && self.has_container_header
    }
}

/// Checks that an encoder run actually left a playable MP4 behind
pub struct OutputVerifier;

impl OutputVerifier {
    /// Inspect the output file without trusting the encoder's exit status
    pub async fn inspect(path: &Path) -> Result<VerificationResult, DomainError> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VerificationResult {
                    file_size: 0,
                    has_container_header: false,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let file_size = file.metadata().await?.len();

        let mut header = [0u8; FTYP_OFFSET + 4];
        let mut filled = 0;
        while filled < header.len() {
            let read = file.read(&mut header[filled..]).await?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        let has_container_header =
            filled == header.len() && &header[FTYP_OFFSET..] == FTYP_TAG;

        debug!(path = %path.display(), file_size, has_container_header, "Inspected encoder output");
        Ok(VerificationResult {
            file_size,
            has_container_header,
        })
    }

    /// Inspect and turn a bad output into an encoding failure
    pub async fn verify(path: &Path) -> Result<VerificationResult, DomainError> {
        let result = Self::inspect(path).await?;
        if !result.is_valid() {
            warn!(path = %path.display(), ?result, "Encoder output failed verification");
            return Err(DomainError::encoding(if result.file_size == 0 {
                "encoder produced no output"
            } else {
                "encoder output is missing an MP4 header"
            }));
        }
        Ok(result)
    }
}
