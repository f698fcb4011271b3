//! FFmpeg execution adapter
//!
//! Runs the `ffmpeg` command-line tool as a child process to cut a trim
//! window out of a stored source. Video and audio are always re-encoded so
//! cuts that do not land on keyframes still produce a finalized, playable
//! MP4.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::domain::errors::*;
use crate::output::OutputVerifier;
use crate::ports::*;

/// How much of the encoder's stderr is kept for diagnostics
const DIAGNOSTICS_TAIL_BYTES: usize = 4096;

/// Encoder binary and codec choices
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub ffmpeg_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "veryfast".to_string(),
            crf: 23,
        }
    }
}

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    settings: EncoderSettings,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Arguments for one re-encoding cut
    pub fn build_args(&self, job: &EncodeJob) -> Vec<String> {
        let settings = &self.settings;
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            job.source.to_string_lossy().to_string(),
            "-ss".to_string(),
            job.window.start.to_arg(),
            "-to".to_string(),
            job.window.end.to_arg(),
            "-c:v".to_string(),
            settings.video_codec.clone(),
            "-preset".to_string(),
            settings.preset.clone(),
            "-crf".to_string(),
            settings.crf.to_string(),
            "-c:a".to_string(),
            settings.audio_codec.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            // The staging name carries no container extension
            "-f".to_string(),
            "mp4".to_string(),
            job.output.to_string_lossy().to_string(),
        ]
    }
}

/// Last few KiB of the tool's stderr, decoded lossily
fn diagnostics_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(DIAGNOSTICS_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

#[async_trait]
impl ExecutePort for FFmpegAdapter {
    async fn encode(&self, job: &EncodeJob) -> Result<EncodeOutcome, DomainError> {
        let started = Instant::now();
        let args = self.build_args(job);
        debug!(
            ffmpeg = %self.settings.ffmpeg_path.display(),
            args = ?args,
            "Spawning encoder"
        );

        // Dropping this future (cancellation or timeout) kills the child
        let output = Command::new(&self.settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                error!(
                    ffmpeg = %self.settings.ffmpeg_path.display(),
                    error = %e,
                    "Failed to spawn encoder"
                );
                DomainError::EncodingFailed {
                    message: format!("failed to spawn encoder: {}", e),
                    diagnostics: String::new(),
                }
            })?;

        if !output.status.success() {
            let diagnostics = diagnostics_tail(&output.stderr);
            error!(
                status = %output.status,
                source = %job.source.display(),
                window = %job.window,
                diagnostics = %diagnostics,
                "Encoder exited with failure"
            );
            return Err(DomainError::EncodingFailed {
                message: format!("encoder exited with {}", output.status),
                diagnostics,
            });
        }

        let verification = OutputVerifier::verify(&job.output).await?;
        let elapsed = started.elapsed();
        info!(
            output = %job.output.display(),
            window = %job.window,
            output_bytes = verification.file_size,
            elapsed_ms = elapsed.as_millis() as u64,
            "Encoder finished"
        );

        Ok(EncodeOutcome {
            output_bytes: verification.file_size,
            elapsed,
        })
    }
}
