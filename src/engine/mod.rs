use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod ytdlp;

pub use ytdlp::YtDlpEngine;

/// Metadata resolved for a URL without downloading anything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaProbe {
    /// Title of the media, if the site reports one
    pub title: Option<String>,

    /// Channel or uploader name
    pub uploader: Option<String>,

    /// Duration in seconds
    pub duration_secs: Option<f64>,
}

/// Parameters for a single download-and-transcode invocation
#[derive(Debug, Clone)]
pub struct FetchSpec {
    /// Target audio container/codec (mp3, m4a, ...)
    pub audio_format: String,

    /// Target bitrate in kbps
    pub bitrate_kbps: u32,

    /// Network retry count handled inside the engine
    pub retries: u32,
}

/// Errors reported by the media extraction engine.
///
/// Messages carried in `Failed` are already short and safe to show to an end
/// user; the raw engine output only ever goes to the operational log.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary could not be started at all
    #[error("media engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran but reported a failure
    #[error("{0}")]
    Failed(String),
}

/// External process that resolves a media URL into a downloadable audio stream.
///
/// Implementations must be cancel-safe: dropping an in-flight `fetch` future
/// (e.g. on timeout) must terminate the underlying subprocess.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Resolve metadata for a URL without downloading
    async fn probe(&self, url: &str) -> Result<MediaProbe, EngineError>;

    /// Download the best available audio stream into `dest_dir`, transcoded
    /// according to `spec`. The output file lands inside `dest_dir` with the
    /// extension given by `spec.audio_format`.
    async fn fetch(&self, url: &str, dest_dir: &Path, spec: &FetchSpec)
        -> Result<(), EngineError>;
}
