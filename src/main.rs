use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod config;
mod export;
mod media;
mod utils;

use config::Settings;
use media::{AudioDownloader, MetadataFetcher};

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch fetch Spotify track metadata and audio", long_about = None)]
struct Args {
    /// Path to JSON file containing Spotify track URLs
    #[arg(short, long, default_value = "data/sample_input.json")]
    input: PathBuf,

    /// Path to the settings.json configuration file
    #[arg(short, long, default_value = "src/config/settings.json")]
    settings: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting Spotify track downloader");

    if !args.input.exists() {
        bail!("Input file does not exist: {}", args.input.display());
    }
    if !args.settings.exists() {
        bail!("Settings file does not exist: {}", args.settings.display());
    }

    let settings = Settings::from_file(&args.settings).context("Unable to load settings")?;
    let urls = utils::load_input_urls(&args.input).context("Unable to load input URLs")?;

    if urls.is_empty() {
        warn!(
            "No valid Spotify URLs found in input file: {}",
            args.input.display()
        );
        bail!("Input file contains no usable URLs");
    }

    info!("Loaded {} Spotify URLs", urls.len());

    let timeout = Duration::from_secs_f64(settings.http_timeout);
    info!(
        "Fetching metadata with timeout={}s and concurrency={}",
        settings.http_timeout, settings.concurrent_requests
    );

    let fetcher = MetadataFetcher::new(timeout, settings.concurrent_requests)?;
    let tracks = fetcher.fetch_all(&urls).await;

    let project_root = std::env::current_dir().context("Failed to resolve working directory")?;
    let output_dir = if settings.export.audio_output_dir.is_absolute() {
        settings.export.audio_output_dir.clone()
    } else {
        project_root.join(&settings.export.audio_output_dir)
    };

    info!("Preparing to download audio files to {}", output_dir.display());
    let downloader = AudioDownloader::new(timeout, settings.concurrent_downloads)?;
    let tracks = downloader.download_all(tracks, &output_dir).await;

    export::export_all(&tracks, &settings.export, &project_root);

    info!("All done.");
    Ok(())
}
