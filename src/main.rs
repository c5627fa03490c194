use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunefetch::cli::{Cli, Commands};
use tunefetch::config::Config;
use tunefetch::fetch::{sources, FetchRequest, FetchResult, Fetcher};
use tunefetch::{health, utils, YtDlpEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "tunefetch=debug"
    } else {
        "tunefetch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Fetch { url, output } => {
            let audio_format = config.engine.audio_format.clone();
            let engine = Arc::new(YtDlpEngine::new(&config.engine.binary));
            let fetcher = Fetcher::new(config, engine)?;

            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            progress.set_message("Fetching audio...");
            progress.enable_steady_tick(Duration::from_millis(120));

            match fetcher.run(FetchRequest::new(url, 0)).await {
                FetchResult::Success(payload) => {
                    progress.finish_and_clear();

                    let dest = output.unwrap_or_else(|| {
                        PathBuf::from(format!(
                            "{}.{}",
                            utils::sanitize_filename(&payload.title),
                            audio_format
                        ))
                    });
                    payload.persist_to(&dest)?;

                    println!(
                        "Saved: {} ({}, {}, by {})",
                        dest.display(),
                        utils::format_file_size(payload.file_size),
                        utils::format_duration(payload.duration_secs),
                        payload.uploader
                    );
                }
                FetchResult::Failure { reason, message } => {
                    progress.finish_and_clear();
                    anyhow::bail!("{}: {}", reason, message);
                }
            }
        }
        Commands::Sources => {
            println!("Recognized source sites:");
            for domain in sources::recognized_domains() {
                println!("  • {}", domain);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file manually:");
                println!("  {}", Config::config_path()?.display());
            }
        }
        Commands::Health => {
            let report = health::check(&config).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.healthy() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
