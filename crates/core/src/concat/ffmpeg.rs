//! FFmpeg-based concatenator implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use super::manifest::Manifest;
use super::traits::Concatenator;
use super::types::{ConcatJob, ConcatResult};
use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::metrics::ENCODER_RUNS_TOTAL;

/// Maximum stderr lines kept for error reporting.
const MAX_STDERR_LINES: usize = 500;

/// Concatenates clips with ffmpeg's concat demuxer and stream copy.
pub struct FfmpegConcatenator {
    config: MergeConfig,
}

impl FfmpegConcatenator {
    /// Creates a new FFmpeg concatenator with the given configuration.
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Creates a concatenator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MergeConfig::default())
    }

    /// Builds the ffmpeg argument list. Every value is a separate argument;
    /// nothing goes through a shell.
    fn build_args(&self, manifest_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-y".to_string(), // Overwrite output
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest_path.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    fn spawn_error(&self, e: std::io::Error) -> MergeError {
        ENCODER_RUNS_TOTAL.with_label_values(&["spawn_error"]).inc();
        if e.kind() == std::io::ErrorKind::NotFound {
            MergeError::EncoderNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            MergeError::io("spawning ffmpeg", e)
        }
    }
}

#[async_trait]
impl Concatenator for FfmpegConcatenator {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn concat(
        &self,
        job: &ConcatJob,
        cancel: &CancellationToken,
    ) -> Result<ConcatResult, MergeError> {
        if job.inputs.is_empty() {
            return Err(MergeError::validation("nothing to concatenate"));
        }

        let start = Instant::now();

        let manifest_path = job.manifest_path();
        Manifest::new(job.inputs.clone())
            .write_to(&manifest_path)
            .await?;

        let args = self.build_args(&manifest_path, &job.output_path);
        tracing::debug!(run_id = job.run_id, ?args, "Spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MergeError::io(
                "capturing ffmpeg stderr",
                std::io::Error::other("stderr was not piped"),
            )
        })?;
        // ffmpeg echoes container metadata verbatim, so stderr is not always UTF-8.
        let mut reader = BufReader::new(stderr).split(b'\n');

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = tokio::select! {
            res = timeout(timeout_duration, async {
                let mut lines = VecDeque::new();
                while let Some(raw) = reader.next_segment().await? {
                    if lines.len() == MAX_STDERR_LINES {
                        lines.pop_front();
                    }
                    lines.push_back(decode_stderr_line(&raw));
                }

                // Wait for process to complete
                let status = child.wait().await?;
                Ok::<_, std::io::Error>((status, lines))
            }) => Some(res),
            _ = cancel.cancelled() => None,
        };

        let (status, lines) = match result {
            Some(Ok(Ok(done))) => done,
            Some(Ok(Err(e))) => {
                let _ = child.kill().await;
                return Err(MergeError::io("waiting for ffmpeg", e));
            }
            Some(Err(_)) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                ENCODER_RUNS_TOTAL.with_label_values(&["timeout"]).inc();
                tracing::error!(
                    run_id = job.run_id,
                    timeout_secs = self.config.timeout_secs,
                    "FFmpeg timed out, process killed"
                );
                return Err(MergeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
            None => {
                let _ = child.kill().await;
                ENCODER_RUNS_TOTAL.with_label_values(&["cancelled"]).inc();
                tracing::warn!(run_id = job.run_id, "FFmpeg cancelled, process killed");
                return Err(MergeError::Cancelled);
            }
        };

        if !status.success() {
            ENCODER_RUNS_TOTAL.with_label_values(&["failure"]).inc();
            for line in &lines {
                tracing::error!(run_id = job.run_id, "ffmpeg: {}", line);
            }
            let stderr = if lines.is_empty() {
                None
            } else {
                Some(Vec::from(lines).join("\n"))
            };
            return Err(MergeError::processing(status.code(), stderr));
        }

        // Verify output exists and get size
        let output_meta = tokio::fs::metadata(&job.output_path).await.map_err(|_| {
            ENCODER_RUNS_TOTAL.with_label_values(&["failure"]).inc();
            MergeError::processing(status.code(), Some("output file not created".to_string()))
        })?;

        ENCODER_RUNS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(
            run_id = job.run_id,
            output = %job.output_path.display(),
            bytes = output_meta.len(),
            "Merged video saved"
        );

        Ok(ConcatResult {
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), MergeError> {
        let status = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MergeError::EncoderNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    MergeError::io("running ffmpeg -version", e)
                }
            })?;

        if !status.success() {
            return Err(MergeError::processing(status.code(), None));
        }

        Ok(())
    }
}

fn decode_stderr_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
