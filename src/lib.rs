//! TrimX server library
//!
//! An HTTP service that stores uploaded videos, cuts requested time windows
//! out of them with ffmpeg and serves the results.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http;
pub mod output;
pub mod ports;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{TimeSpec, TrimRequest, TrimWindow, TrimmedArtifact};
pub use error::{ServerError, ServerResult};
