//! Output file verification module

pub mod verifier;

pub use verifier::{OutputVerifier, VerificationResult};
