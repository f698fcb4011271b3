// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::errors::DomainError;

/// Time specification with precision - represents an offset in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a TimeSpec, rejecting negative and non-finite values
    pub fn from_seconds(seconds: f64) -> Result<Self, DomainError> {
        if !seconds.is_finite() {
            return Err(DomainError::BadRequest(
                "Time must be a finite number".to_string(),
            ));
        }
        if seconds < 0.0 {
            return Err(DomainError::BadRequest("Time cannot be negative".to_string()));
        }
        Ok(Self { seconds })
    }

    /// Parse time string: plain seconds, MM:SS.ms or HH:MM:SS.ms
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();
        if trimmed.is_empty() {
            return Err(DomainError::BadRequest("Time cannot be empty".to_string()));
        }

        if let Ok(seconds) = trimmed.parse::<f64>() {
            return Self::from_seconds(seconds);
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = parse_component(minutes, "minutes")?;
                let seconds = parse_seconds_component(seconds)?;
                Self::from_seconds(minutes as f64 * 60.0 + seconds)
            }
            [hours, minutes, seconds] => {
                let hours = parse_component(hours, "hours")?;
                let minutes = parse_component(minutes, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadRequest(
                        "Minutes must be less than 60".to_string(),
                    ));
                }
                let seconds = parse_seconds_component(seconds)?;
                Self::from_seconds(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
            }
            _ => Err(DomainError::BadRequest(
                "Invalid time format. Supported formats: seconds (e.g., 12.5), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)".to_string(),
            )),
        }
    }

    /// Render for encoder arguments: seconds with millisecond precision
    pub fn to_arg(&self) -> String {
        format!("{:.3}", self.seconds)
    }

    /// Format as HH:MM:SS.mmm, or MM:SS.mmm below one hour
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let milliseconds = total_ms % 1000;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

fn parse_component(part: &str, name: &str) -> Result<u32, DomainError> {
    part.trim()
        .parse::<u32>()
        .map_err(|_| DomainError::BadRequest(format!("Invalid {} format", name)))
}

fn parse_seconds_component(part: &str) -> Result<f64, DomainError> {
    let seconds = part
        .trim()
        .parse::<f64>()
        .map_err(|_| DomainError::BadRequest("Invalid seconds format".to_string()))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(DomainError::BadRequest("Invalid seconds format".to_string()));
    }
    if seconds >= 60.0 {
        return Err(DomainError::BadRequest(
            "Seconds must be less than 60".to_string(),
        ));
    }
    Ok(seconds)
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// A time value as it arrives on the wire: a JSON number or a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Seconds(f64),
    Text(String),
}

impl TimeInput {
    /// Resolve into a validated TimeSpec
    pub fn to_time_spec(&self) -> Result<TimeSpec, DomainError> {
        match self {
            TimeInput::Seconds(seconds) => TimeSpec::from_seconds(*seconds),
            TimeInput::Text(text) => TimeSpec::parse(text),
        }
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_string())
    }
}

impl From<f64> for TimeInput {
    fn from(value: f64) -> Self {
        TimeInput::Seconds(value)
    }
}

/// The `(start, end)` second-offset pair of a trim. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: TimeSpec,
    pub end: TimeSpec,
}

impl TrimWindow {
    /// Create a window, rejecting empty or inverted ranges
    pub fn new(start: TimeSpec, end: TimeSpec) -> Result<Self, DomainError> {
        if start.seconds >= end.seconds {
            return Err(DomainError::BadRequest(
                "Start time must be less than end time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Length of the requested clip
    pub fn duration(&self) -> TimeSpec {
        TimeSpec {
            seconds: self.end.seconds - self.start.seconds,
        }
    }
}

impl fmt::Display for TrimWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Validated request to cut a stored source. Transient, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimRequest {
    pub identifier: String,
    pub window: TrimWindow,
}

impl TrimRequest {
    /// Build a request from raw optional fields, in the order the client
    /// sees validation messages: filename, presence of times, parse, range.
    pub fn from_parts(
        identifier: Option<String>,
        start: Option<TimeInput>,
        end: Option<TimeInput>,
    ) -> Result<Self, DomainError> {
        let identifier = identifier
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DomainError::BadRequest("Filename is required".to_string()))?;

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(DomainError::BadRequest(
                    "Start and end times are required".to_string(),
                ))
            }
        };

        let start = start
            .to_time_spec()
            .map_err(|e| DomainError::BadRequest(format!("Invalid start time: {}", detail(&e))))?;
        let end = end
            .to_time_spec()
            .map_err(|e| DomainError::BadRequest(format!("Invalid end time: {}", detail(&e))))?;

        Ok(Self {
            identifier,
            window: TrimWindow::new(start, end)?,
        })
    }
}

fn detail(err: &DomainError) -> String {
    match err {
        DomainError::BadRequest(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// A previously uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSource {
    pub identifier: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_type: String,
}

/// A produced output file
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedArtifact {
    pub identifier: String,
    /// Public location, only written once the encode has been verified
    pub path: PathBuf,
    /// Where the encoder writes while it runs
    pub staging_path: PathBuf,
    pub url: String,
}
