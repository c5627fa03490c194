//! Deployment-facing health reporting.
//!
//! Lives outside the fetch pipeline's contract: a platform supervisor (or an
//! operator) can ask whether the process could serve a request right now
//! without actually fetching anything.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::engine::YtDlpEngine;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// Whether the engine binary could be executed
    pub engine_available: bool,

    /// Engine version string, when available
    pub engine_version: Option<String>,

    /// Where per-request scratch directories are created
    pub scratch_root: PathBuf,

    /// Whether the scratch root can be written to
    pub scratch_root_writable: bool,
}

impl HealthReport {
    pub fn healthy(&self) -> bool {
        self.engine_available && self.scratch_root_writable
    }
}

/// Probe the engine binary and the scratch root
pub async fn check(config: &Config) -> HealthReport {
    let engine = YtDlpEngine::new(&config.engine.binary);
    let engine_version = match engine.version().await {
        Ok(version) => Some(version),
        Err(err) => {
            tracing::warn!(error = %err, "engine health probe failed");
            None
        }
    };

    let scratch_root = config.scratch_root();
    let scratch_root_writable = probe_writable(&scratch_root);

    HealthReport {
        engine_available: engine_version.is_some(),
        engine_version,
        scratch_root,
        scratch_root_writable,
    }
}

fn probe_writable(dir: &Path) -> bool {
    if fs_err::create_dir_all(dir).is_err() {
        return false;
    }
    tempfile::tempfile_in(dir).is_ok()
}
