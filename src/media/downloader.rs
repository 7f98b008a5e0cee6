use super::types::TrackResult;
use crate::utils::safe_filename;
use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

const FILENAME_FALLBACK: &str = "spotify_track";
const MAX_FILENAME_LENGTH: usize = 120;

/// Downloads the first media stream of every track to disk with bounded
/// concurrency, flagging `error` on the affected record when anything fails.
pub struct AudioDownloader {
    client: Client,
    concurrency: usize,
}

impl AudioDownloader {
    pub fn new(timeout: Duration, concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for audio download")?;
        Ok(Self {
            client,
            concurrency,
        })
    }

    /// Download audio for every track that carries a media descriptor. The
    /// list is consumed and returned with per-track `error` flags updated;
    /// no other field changes. Per-track failures never abort the batch.
    pub async fn download_all(
        &self,
        tracks: Vec<TrackResult>,
        output_dir: &Path,
    ) -> Vec<TrackResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut handles = Vec::with_capacity(tracks.len());
        let mut urls = Vec::with_capacity(tracks.len());

        for track in tracks {
            urls.push(track.url.clone());
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let output_dir = output_dir.to_path_buf();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let mut track = track;
                        track.error = true;
                        return track;
                    }
                };
                download_single(&client, track, &output_dir).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (url, handle) in urls.into_iter().zip(handles) {
            match handle.await {
                Ok(track) => results.push(track),
                Err(e) => {
                    error!("Download task for {} failed: {}", url, e);
                    results.push(TrackResult::failed(url));
                }
            }
        }
        results
    }
}

async fn download_single(
    client: &Client,
    mut track: TrackResult,
    output_dir: &Path,
) -> TrackResult {
    let Some(media) = track.medias.first().cloned() else {
        warn!("No media streams defined for {}", track.result_url);
        track.error = true;
        return track;
    };

    if media.url.is_empty() {
        warn!("Empty media URL for track: {}", track.title);
        track.error = true;
        return track;
    }

    let name = if track.title.is_empty() {
        track.result_url.clone()
    } else {
        track.title.clone()
    };
    let filename = format!(
        "{}.{}",
        safe_filename(&name, FILENAME_FALLBACK, MAX_FILENAME_LENGTH),
        media.extension
    );
    let file_path = output_dir.join(filename);

    info!(
        "Downloading audio for '{}' -> {}",
        track.title,
        file_path.display()
    );

    match stream_to_file(client, &media.url, &file_path).await {
        Ok(()) => info!("Successfully downloaded '{}'", file_path.display()),
        Err(e) => {
            error!("Failed to download {}: {:#}", media.url, e);
            track.error = true;
        }
    }

    track
}

/// Stream one media URL to disk. A partial file may remain on disk when the
/// transfer fails mid-stream; the caller flags the record instead.
async fn stream_to_file(client: &Client, media_url: &str, file_path: &Path) -> Result<()> {
    let mut response = client
        .get(media_url)
        .send()
        .await
        .context("Request failed")?;

    if response.status() != StatusCode::OK {
        bail!("HTTP {}", response.status());
    }

    if let Some(parent) = file_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let mut file = tokio::fs::File::create(file_path)
        .await
        .with_context(|| format!("Failed to create {}", file_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("Failed to read stream")? {
        if chunk.is_empty() {
            continue;
        }
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", file_path.display()))?;
    }
    file.flush().await.context("Failed to flush file")?;

    Ok(())
}
