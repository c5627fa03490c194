//! End-to-end pipeline tests against a scripted fake engine binary.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tunefetch::config::Config;
use tunefetch::fetch::{ErrorKind, FetchRequest, FetchResult, Fetcher};
use tunefetch::YtDlpEngine;

/// Write an executable shell script that mimics yt-dlp: answers `--version`,
/// prints `probe_json` for probe calls, and runs `download` for fetch calls.
fn fake_engine(dir: &Path, probe_json: &str, download: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "2026.01.01"
  exit 0
fi
json=0
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  if [ "$a" = "--dump-json" ]; then json=1; fi
  prev="$a"
done
if [ "$json" = "1" ]; then
{probe_json}
fi
out=$(printf '%s' "$out" | sed -e 's/%(id)s/clip/' -e 's/%(ext)s/mp3/')
{download}
"#,
        probe_json = probe_json,
        download = download,
    );

    let path = dir.join("fake-yt-dlp");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const PROBE_OK: &str = r#"  echo '{"title":"Test Track","uploader":"Test Channel","duration":120}'
  exit 0"#;

fn config_for(binary: &Path, scratch: &Path) -> Config {
    let mut config = Config::default();
    config.engine.binary = binary.to_string_lossy().to_string();
    config.app.scratch_root = Some(scratch.to_path_buf());
    config
}

fn scratch_is_empty(root: &Path) -> bool {
    std::fs::read_dir(root).unwrap().next().is_none()
}

#[tokio::test]
async fn end_to_end_success_through_real_subprocesses() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let binary = fake_engine(
        dir.path(),
        PROBE_OK,
        r#"head -c 50000 /dev/zero > "$out"
exit 0"#,
    );

    let config = config_for(&binary, scratch.path());
    let engine = Arc::new(YtDlpEngine::new(&config.engine.binary));
    let fetcher = Fetcher::new(config, engine).unwrap();

    let result = fetcher
        .run(FetchRequest::new("https://youtu.be/VALID123", 42))
        .await;

    match result {
        FetchResult::Success(payload) => {
            assert_eq!(payload.duration_secs, 120);
            assert_eq!(payload.file_size, 50_000);
            assert_eq!(payload.title, "Test Track");
            assert!(payload.path().exists());
            drop(payload);
        }
        FetchResult::Failure { reason, message } => {
            panic!("expected success, got {}: {}", reason, message)
        }
    }
    assert!(scratch_is_empty(scratch.path()));
}

#[tokio::test]
async fn wall_clock_timeout_terminates_the_subprocess() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let marker = dir.path().join("survived");
    let binary = fake_engine(
        dir.path(),
        PROBE_OK,
        &format!(
            r#"sleep 2
touch "{}"
exit 0"#,
            marker.display()
        ),
    );

    let mut config = config_for(&binary, scratch.path());
    config.limits.fetch_timeout_secs = 1;

    let engine = Arc::new(YtDlpEngine::new(&config.engine.binary));
    let fetcher = Fetcher::new(config, engine).unwrap();

    let started = Instant::now();
    let result = fetcher
        .run(FetchRequest::new("https://youtu.be/SLOW", 1))
        .await;

    assert_eq!(result.failure_reason(), Some(ErrorKind::Timeout));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(scratch_is_empty(scratch.path()));

    // Wait past the script's sleep: the marker only appears if the
    // subprocess outlived the timeout
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!marker.exists(), "engine subprocess was not terminated");
}

#[tokio::test]
async fn probe_error_is_classified_for_the_user() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let binary = fake_engine(
        dir.path(),
        r#"  echo "ERROR: Private video. Sign in if you've been granted access" >&2
  exit 1"#,
        "exit 1",
    );

    let config = config_for(&binary, scratch.path());
    let engine = Arc::new(YtDlpEngine::new(&config.engine.binary));
    let fetcher = Fetcher::new(config, engine).unwrap();

    let result = fetcher
        .run(FetchRequest::new("https://youtu.be/PRIVATE", 7))
        .await;

    match result {
        FetchResult::Failure { reason, message } => {
            assert_eq!(reason, ErrorKind::EngineFailure);
            assert_eq!(message, "This video is private");
        }
        FetchResult::Success(_) => panic!("expected failure"),
    }
    assert!(scratch_is_empty(scratch.path()));
}

#[tokio::test]
async fn missing_binary_reports_engine_unavailable() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.engine.binary = "definitely-not-a-real-binary-xyz".to_string();
    config.app.scratch_root = Some(scratch.path().to_path_buf());

    let engine = Arc::new(YtDlpEngine::new(&config.engine.binary));
    let fetcher = Fetcher::new(config, engine).unwrap();

    let result = fetcher
        .run(FetchRequest::new("https://youtu.be/VALID123", 1))
        .await;

    assert_eq!(result.failure_reason(), Some(ErrorKind::EngineUnavailable));
    assert!(scratch_is_empty(scratch.path()));
}
