use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tunefetch",
    about = "Fetch audio tracks from video-sharing sites via yt-dlp",
    version,
    long_about = "Resolves a video-sharing URL into a transcoded audio file with bounded \
resource usage: pre-download duration checks, hard wall-clock timeouts, and guaranteed \
scratch-directory cleanup. The same pipeline backs chat-bot deployments; this CLI drives \
it for one-off use."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the audio track for a video URL
    Fetch {
        /// Video URL from a recognized source site
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (derived from the track title if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List recognized source sites
    Sources,

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that the engine and scratch directory are usable
    Health,
}
