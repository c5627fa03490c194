//! The per-request fetch-and-deliver pipeline.
//!
//! One `FetchRequest` goes in, one `FetchResult` comes out. Every request gets
//! its own scratch directory and its own engine subprocess; the scratch
//! directory is removed exactly once on every exit path, including timeouts
//! and panics, via scoped ownership (`tempfile::TempDir`).

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::{BusyPolicy, Config};
use crate::engine::{EngineError, FetchSpec, MediaEngine};
use crate::utils::truncate_chars;

pub mod sources;

/// One inbound request, forwarded by the gateway. Consumed once; never persisted.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL as typed by the user
    pub url: String,

    /// Opaque identifier of the requesting chat
    pub chat_id: i64,

    /// When the gateway forwarded the message
    pub issued_at: DateTime<Utc>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, chat_id: i64) -> Self {
        Self {
            url: url.into(),
            chat_id,
            issued_at: Utc::now(),
        }
    }
}

/// Classified failure reasons surfaced to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// URL absent or not matching a recognized source pattern
    InvalidInput,
    /// Resource exceeds configured limits (duration too long, etc.)
    PolicyViolation,
    /// Engine failed to start or is misconfigured
    EngineUnavailable,
    /// Engine ran but reported an error
    EngineFailure,
    /// Engine reported success but no usable output file was found
    EngineOutputMissing,
    /// A step exceeded its configured time budget
    Timeout,
    /// Concurrency limit reached
    Overloaded,
    /// Unclassified fault, logged in full, surfaced only generically
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::PolicyViolation => "policy violation",
            ErrorKind::EngineUnavailable => "engine unavailable",
            ErrorKind::EngineFailure => "engine failure",
            ErrorKind::EngineOutputMissing => "engine output missing",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Overloaded => "overloaded",
            ErrorKind::Unknown => "unknown error",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of one request
#[derive(Debug)]
pub enum FetchResult {
    Success(AudioPayload),
    Failure {
        reason: ErrorKind,
        /// Short, truncated, user-safe message
        message: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }

    /// The failure reason, if this is a failure
    pub fn failure_reason(&self) -> Option<ErrorKind> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Failure { reason, .. } => Some(*reason),
        }
    }
}

/// A fetched audio file, still inside its scratch directory.
///
/// The payload owns the scratch directory: dropping it removes the directory
/// and everything in it. Read or copy the file out before letting go.
#[derive(Debug)]
pub struct AudioPayload {
    /// Track title, truncated to the display limit
    pub title: String,

    /// Uploader/channel name, truncated to the display limit
    pub uploader: String,

    /// Probed duration in whole seconds
    pub duration_secs: u64,

    /// Size of the audio file in bytes
    pub file_size: u64,

    path: PathBuf,
    _workdir: TempDir,
}

impl AudioPayload {
    /// Path of the audio file inside the scratch directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the audio file out of the scratch directory
    pub fn persist_to(&self, dest: &Path) -> anyhow::Result<()> {
        fs_err::copy(&self.path, dest)?;
        Ok(())
    }
}

/// The Media Fetch Job: converts one request into one result with bounded
/// resource usage and no leaked state.
pub struct Fetcher {
    config: Config,
    engine: Arc<dyn MediaEngine>,
    limiter: Arc<Semaphore>,
    scratch_root: PathBuf,
}

impl Fetcher {
    /// Create a pipeline instance. The scratch root is created if missing; the
    /// concurrency limiter is sized from the configuration.
    pub fn new(config: Config, engine: Arc<dyn MediaEngine>) -> anyhow::Result<Self> {
        config.validate()?;
        let scratch_root = config.scratch_root();
        fs_err::create_dir_all(&scratch_root)?;
        let limiter = Arc::new(Semaphore::new(config.limits.max_concurrent));

        Ok(Self {
            config,
            engine,
            limiter,
            scratch_root,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline for one request.
    ///
    /// Never returns an error and never panics on engine misbehavior: every
    /// failure is classified into an [`ErrorKind`] with a short user-safe
    /// message, and the scratch directory is gone by the time the result (and,
    /// on success, the payload) is dropped.
    pub async fn run(&self, request: FetchRequest) -> FetchResult {
        tracing::info!(chat_id = request.chat_id, url = %request.url, "fetch requested");

        if !sources::is_recognized(&request.url) {
            return self.failure(
                ErrorKind::InvalidInput,
                "Unsupported link. Send a YouTube URL.",
            );
        }

        let workdir = match tempfile::Builder::new()
            .prefix(&format!("fetch-{}-", Uuid::new_v4().simple()))
            .tempdir_in(&self.scratch_root)
        {
            Ok(dir) => dir,
            Err(err) => {
                tracing::error!(error = %err, "failed to create scratch directory");
                return self.failure(ErrorKind::Unknown, "Internal error. Try again later.");
            }
        };

        let probe_budget = Duration::from_secs(self.config.limits.probe_timeout_secs);
        let probe = match tokio::time::timeout(probe_budget, self.engine.probe(&request.url)).await
        {
            Err(_) => {
                return self.failure(ErrorKind::Timeout, "Timed out while inspecting the link.")
            }
            Ok(Err(err)) => return self.engine_failure(err),
            Ok(Ok(probe)) => probe,
        };

        let duration_secs = probe.duration_secs.unwrap_or(0.0);
        let max_duration = self.config.limits.max_duration_secs;
        if duration_secs > max_duration as f64 {
            return self.failure(
                ErrorKind::PolicyViolation,
                format!(
                    "Track is too long: {} (limit {})",
                    crate::utils::format_duration(duration_secs.round() as u64),
                    crate::utils::format_duration(max_duration),
                ),
            );
        }

        // The limiter gates the download step only; probes are cheap.
        let _permit = match self.config.limits.busy_policy {
            BusyPolicy::Reject => match self.limiter.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    return self.failure(
                        ErrorKind::Overloaded,
                        "Too many downloads in progress. Try again in a moment.",
                    )
                }
            },
            BusyPolicy::Wait => match self.limiter.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Semaphore closed; cannot happen while the Fetcher is alive
                    return self.failure(ErrorKind::Unknown, "Internal error. Try again later.");
                }
            },
        };

        let spec = FetchSpec {
            audio_format: self.config.engine.audio_format.clone(),
            bitrate_kbps: self.config.engine.bitrate_kbps,
            retries: self.config.engine.retries,
        };
        let fetch_budget = Duration::from_secs(self.config.limits.fetch_timeout_secs);
        // Dropping the engine future on timeout terminates its subprocess
        match tokio::time::timeout(
            fetch_budget,
            self.engine.fetch(&request.url, workdir.path(), &spec),
        )
        .await
        {
            Err(_) => {
                tracing::warn!(
                    chat_id = request.chat_id,
                    budget_secs = self.config.limits.fetch_timeout_secs,
                    "download exceeded its time budget"
                );
                return self.failure(ErrorKind::Timeout, "Download timed out. Try again later.");
            }
            Ok(Err(err)) => return self.engine_failure(err),
            Ok(Ok(())) => {}
        }

        let (path, file_size) = match self.locate_output(workdir.path()) {
            Ok(found) => found,
            Err(detail) => {
                tracing::warn!(chat_id = request.chat_id, %detail, "no usable engine output");
                return self.failure(
                    ErrorKind::EngineOutputMissing,
                    "The download produced no usable audio file.",
                );
            }
        };

        let title_limit = self.config.limits.title_limit;
        let payload = AudioPayload {
            title: truncate_chars(probe.title.as_deref().unwrap_or("Audio"), title_limit),
            uploader: truncate_chars(probe.uploader.as_deref().unwrap_or("Unknown"), title_limit),
            duration_secs: duration_secs.round() as u64,
            file_size,
            path,
            _workdir: workdir,
        };

        tracing::info!(
            chat_id = request.chat_id,
            title = %payload.title,
            size_bytes = payload.file_size,
            "fetch complete"
        );

        FetchResult::Success(payload)
    }

    /// Find the single audio file the engine produced.
    ///
    /// Exactly one file with the configured extension must exist, and it must
    /// be at least the minimum plausible size; anything else means the engine
    /// lied about success.
    fn locate_output(&self, dir: &Path) -> Result<(PathBuf, u64), String> {
        let ext = &self.config.engine.audio_format;
        let mut candidates = Vec::new();

        let entries = fs_err::read_dir(dir).map_err(|e| e.to_string())?;
        for entry in entries {
            let entry = entry.map_err(|e| e.to_string())?;
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false);
            if matches {
                candidates.push(path);
            }
        }

        match candidates.as_slice() {
            [] => Err(format!("no .{} file in scratch directory", ext)),
            [path] => {
                let size = fs_err::metadata(path).map_err(|e| e.to_string())?.len();
                if size < self.config.limits.min_output_bytes {
                    return Err(format!(
                        "output file is implausibly small ({} bytes)",
                        size
                    ));
                }
                Ok((path.clone(), size))
            }
            many => Err(format!("{} candidate output files", many.len())),
        }
    }

    fn failure(&self, reason: ErrorKind, message: impl Into<String>) -> FetchResult {
        let message = truncate_chars(&message.into(), self.config.limits.message_limit);
        tracing::warn!(%reason, %message, "fetch failed");
        FetchResult::Failure { reason, message }
    }

    fn engine_failure(&self, err: EngineError) -> FetchResult {
        match err {
            EngineError::Unavailable(detail) => {
                tracing::error!(%detail, "media engine unavailable");
                self.failure(
                    ErrorKind::EngineUnavailable,
                    "The downloader is currently unavailable. Try again later.",
                )
            }
            EngineError::Failed(message) => self.failure(ErrorKind::EngineFailure, message),
        }
    }
}
