//! Tunefetch - a per-request audio fetch pipeline for chat bots
//!
//! This library turns a video-sharing URL into a transcoded audio file with bounded
//! resource usage and guaranteed cleanup. The heavy lifting (stream resolution, format
//! negotiation, transcoding) is delegated to an external engine (yt-dlp); the pipeline
//! owns validation, limits, timeouts, scratch-directory lifecycle, and error
//! classification.

pub mod cli;
pub mod config;
pub mod engine;
pub mod fetch;
pub mod health;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use engine::{EngineError, FetchSpec, MediaEngine, MediaProbe, YtDlpEngine};
pub use fetch::{AudioPayload, ErrorKind, FetchRequest, FetchResult, Fetcher};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
