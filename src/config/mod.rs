use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Media extraction engine settings
    pub engine: EngineConfig,

    /// Per-request limits and policies
    pub limits: LimitConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name or path of the yt-dlp binary
    pub binary: String,

    /// Target audio container/codec (also the expected output extension)
    pub audio_format: String,

    /// Target bitrate in kbps for the transcoded audio
    pub bitrate_kbps: u32,

    /// Network retry count delegated to the engine's own retry mechanism
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Longest track the pipeline will download, in seconds
    pub max_duration_secs: u64,

    /// Wall-clock budget for the metadata probe, in seconds
    pub probe_timeout_secs: u64,

    /// Wall-clock budget for the download/transcode step, in seconds
    pub fetch_timeout_secs: u64,

    /// Maximum simultaneous engine downloads
    pub max_concurrent: usize,

    /// What to do with requests arriving beyond the concurrency limit
    pub busy_policy: BusyPolicy,

    /// Smallest output file considered a real download, in bytes
    pub min_output_bytes: u64,

    /// Display limit for title and uploader strings, in characters
    pub title_limit: usize,

    /// Display limit for user-facing error messages, in characters
    pub message_limit: usize,
}

/// Policy for requests that arrive while all download slots are busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Queue in arrival order until a slot frees up
    Wait,
    /// Fail immediately with an overloaded error
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory for per-request scratch directories (system temp if unset)
    pub scratch_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                binary: "yt-dlp".to_string(),
                audio_format: "mp3".to_string(),
                bitrate_kbps: 192,
                retries: 10,
            },
            limits: LimitConfig {
                max_duration_secs: 1800,
                probe_timeout_secs: 30,
                fetch_timeout_secs: 120,
                max_concurrent: 3,
                busy_policy: BusyPolicy::Wait,
                min_output_bytes: 1024,
                title_limit: 64,
                message_limit: 200,
            },
            app: AppConfig { scratch_root: None },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("tunefetch").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.engine.binary.is_empty() {
            anyhow::bail!("Engine binary must be configured");
        }
        if self.engine.audio_format.is_empty() {
            anyhow::bail!("Audio format must be configured");
        }
        if self.engine.bitrate_kbps == 0 {
            anyhow::bail!("Bitrate must be greater than zero");
        }
        if self.limits.max_duration_secs == 0 {
            anyhow::bail!("Maximum duration must be greater than zero");
        }
        if self.limits.probe_timeout_secs == 0 || self.limits.fetch_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be greater than zero");
        }
        if self.limits.max_concurrent == 0 {
            anyhow::bail!("Must allow at least one concurrent download");
        }
        if self.limits.title_limit == 0 || self.limits.message_limit == 0 {
            anyhow::bail!("Display limits must be greater than zero");
        }

        Ok(())
    }

    /// Root directory under which per-request scratch directories are created
    pub fn scratch_root(&self) -> PathBuf {
        self.app
            .scratch_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tunefetch"))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Engine Binary: {}", self.engine.binary);
        println!(
            "  Audio Format: {} @ {} kbps",
            self.engine.audio_format, self.engine.bitrate_kbps
        );
        println!("  Engine Retries: {}", self.engine.retries);
        println!("  Max Duration: {}s", self.limits.max_duration_secs);
        println!(
            "  Timeouts: probe {}s, fetch {}s",
            self.limits.probe_timeout_secs, self.limits.fetch_timeout_secs
        );
        println!(
            "  Concurrency: {} ({:?} when busy)",
            self.limits.max_concurrent, self.limits.busy_policy
        );
        println!("  Scratch Root: {}", self.scratch_root().display());
    }
}
