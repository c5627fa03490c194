use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{EngineError, FetchSpec, MediaEngine, MediaProbe};

/// Media extraction engine backed by the yt-dlp command-line tool
pub struct YtDlpEngine {
    binary: String,
}

impl YtDlpEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check that the binary can be executed and report its version
    pub async fn version(&self) -> Result<String, EngineError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(&self.binary, &e))?;

        if !output.status.success() {
            return Err(EngineError::Unavailable(format!(
                "{} --version exited with {}",
                self.binary, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn probe_args(url: &str) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            url.to_string(),
        ]
    }

    fn fetch_args(url: &str, dest_dir: &Path, spec: &FetchSpec) -> Vec<String> {
        vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            spec.audio_format.clone(),
            "--audio-quality".to_string(),
            format!("{}K", spec.bitrate_kbps),
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--retries".to_string(),
            spec.retries.to_string(),
            "-o".to_string(),
            dest_dir.join("%(id)s.%(ext)s").to_string_lossy().to_string(),
            url.to_string(),
        ]
    }

    /// Run the engine binary to completion, capturing output.
    ///
    /// `kill_on_drop` guarantees the subprocess is terminated if the caller's
    /// future is dropped mid-flight, which is how the pipeline's wall-clock
    /// timeout cancels a runaway download.
    async fn run(&self, args: &[String]) -> Result<std::process::Output, EngineError> {
        Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.binary, &e))
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn probe(&self, url: &str) -> Result<MediaProbe, EngineError> {
        tracing::debug!(%url, "probing media metadata");

        let output = self.run(&Self::probe_args(url)).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(%url, stderr = %stderr.trim(), "engine probe failed");
            return Err(EngineError::Failed(summarize_stderr(&stderr)));
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::Failed(format!("Engine returned invalid metadata: {}", e)))?;

        Ok(MediaProbe {
            title: info["title"].as_str().map(str::to_string),
            uploader: info["uploader"].as_str().map(str::to_string),
            duration_secs: info["duration"].as_f64(),
        })
    }

    async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        spec: &FetchSpec,
    ) -> Result<(), EngineError> {
        tracing::debug!(%url, dest = %dest_dir.display(), "downloading audio");

        let output = self.run(&Self::fetch_args(url, dest_dir, spec)).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(%url, stderr = %stderr.trim(), "engine download failed");
            return Err(EngineError::Failed(summarize_stderr(&stderr)));
        }

        Ok(())
    }
}

fn spawn_error(binary: &str, err: &std::io::Error) -> EngineError {
    if err.kind() == std::io::ErrorKind::NotFound {
        EngineError::Unavailable(format!("{} not found in PATH", binary))
    } else {
        EngineError::Unavailable(format!("failed to start {}: {}", binary, err))
    }
}

/// Map raw yt-dlp stderr onto a short, user-presentable reason.
///
/// The full stderr is logged by the caller; nothing here may leak stack traces
/// or multi-line diagnostics to the end user.
fn summarize_stderr(stderr: &str) -> String {
    let lower = stderr.to_lowercase();

    if lower.contains("private video") {
        return "This video is private".to_string();
    }
    if lower.contains("sign in to confirm your age") || lower.contains("age-restricted") {
        return "This video is age-restricted".to_string();
    }
    if lower.contains("video unavailable") || lower.contains("this video is not available") {
        return "Video unavailable or removed".to_string();
    }
    if lower.contains("geo") && lower.contains("block") || lower.contains("not available in your country") {
        return "Video is not available in this region".to_string();
    }
    if lower.contains("http error 429") {
        return "The source site is rate-limiting downloads, try again later".to_string();
    }
    if lower.contains("unsupported url") {
        return "This link is not supported".to_string();
    }
    if lower.contains("ffmpeg") && (lower.contains("not found") || lower.contains("no such file")) {
        return "Audio conversion tool is missing on the server".to_string();
    }

    // Fall back to the last ERROR: line yt-dlp printed, if any
    let last_error_line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.to_lowercase().starts_with("error"))
        .map(|l| {
            l.strip_prefix("ERROR: ")
                .or_else(|| l.strip_prefix("ERROR:"))
                .unwrap_or(l)
        });

    match last_error_line {
        Some(line) => format!("Download failed: {}", line),
        None => "Download failed".to_string(),
    }
}
