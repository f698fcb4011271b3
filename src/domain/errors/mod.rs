// Domain errors - Error types for the upload and trim pipeline

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Missing or malformed request fields
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload exceeded the configured size limit
    #[error("Payload too large: limit is {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: u64 },

    /// Unknown source identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// External encoder failed; `diagnostics` carries the tool's stderr tail
    #[error("Encoding failed: {message}")]
    EncodingFailed { message: String, diagnostics: String },

    /// Encode queue is full
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Filesystem or unexpected failure
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Create an encoding failure without captured diagnostics
    pub fn encoding(message: impl Into<String>) -> Self {
        DomainError::EncodingFailed {
            message: message.into(),
            diagnostics: String::new(),
        }
    }

    /// Message that is safe to hand to an untrusted client.
    ///
    /// Validation messages are echoed as-is; everything that could carry
    /// paths or encoder output is replaced by a generic sentence.
    pub fn client_message(&self) -> String {
        match self {
            DomainError::BadRequest(msg) | DomainError::NotFound(msg) => msg.clone(),
            DomainError::PayloadTooLarge { limit_bytes } => format!(
                "File too large (maximum {} MB)",
                limit_bytes / 1024 / 1024
            ),
            DomainError::EncodingFailed { .. } => "Video processing failed".to_string(),
            DomainError::ServiceUnavailable(_) => {
                "Server is busy, please retry later".to_string()
            }
            DomainError::InternalError(_) => "Internal server error".to_string(),
        }
    }

    /// Short machine-readable kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::BadRequest(_) => "bad_request",
            DomainError::PayloadTooLarge { .. } => "payload_too_large",
            DomainError::NotFound(_) => "not_found",
            DomainError::EncodingFailed { .. } => "encoding_failed",
            DomainError::ServiceUnavailable(_) => "service_unavailable",
            DomainError::InternalError(_) => "internal_error",
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::InternalError(err.to_string())
    }
}
