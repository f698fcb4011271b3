// Domain rules - Naming and identifier policies

use crate::domain::errors::DomainError;

/// Extension used when the client's file name offers nothing usable
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// Prefix for every trimmed output name
pub const TRIMMED_PREFIX: &str = "trim-";

/// Longest identifier the store will ever generate, with generous headroom
const MAX_IDENTIFIER_LEN: usize = 128;

/// Video container extensions accepted from client file names
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "webm", "mkv", "avi", "mpeg", "mpg", "ogv", "3gp",
];

/// Business rules for choosing stored file extensions
pub struct ExtensionPolicy;

impl ExtensionPolicy {
    /// Pick the extension for a stored upload from the client's file name.
    ///
    /// Only a known video extension survives; everything else in the
    /// client name is discarded.
    pub fn for_upload(original_name: Option<&str>) -> &'static str {
        original_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .and_then(|ext| VIDEO_EXTENSIONS.iter().find(|known| **known == ext))
            .copied()
            .unwrap_or(DEFAULT_VIDEO_EXTENSION)
    }

    /// Content type advertised for a stored file with this extension
    pub fn content_type(extension: &str) -> &'static str {
        match extension.to_ascii_lowercase().as_str() {
            "mov" => "video/quicktime",
            "webm" => "video/webm",
            "mkv" => "video/x-matroska",
            "avi" => "video/x-msvideo",
            "mpeg" | "mpg" => "video/mpeg",
            "ogv" => "video/ogg",
            "3gp" => "video/3gpp",
            "m4v" => "video/x-m4v",
            _ => "video/mp4",
        }
    }
}

/// Business rules for client-supplied identifiers
pub struct IdentifierPolicy;

impl IdentifierPolicy {
    /// Check that an identifier can only ever name a file directly inside a
    /// store directory: a single path component made of `[A-Za-z0-9._-]`,
    /// no leading dot, no `..`.
    pub fn validate(identifier: &str) -> Result<(), DomainError> {
        let invalid = || DomainError::BadRequest("Invalid filename".to_string());

        if identifier.is_empty() || identifier.len() > MAX_IDENTIFIER_LEN {
            return Err(invalid());
        }
        if identifier.starts_with('.') || identifier.contains("..") {
            return Err(invalid());
        }
        if !identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid());
        }
        Ok(())
    }

    /// Extension part of an already validated identifier
    pub fn extension(identifier: &str) -> &str {
        identifier
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or(DEFAULT_VIDEO_EXTENSION)
    }
}
