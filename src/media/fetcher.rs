use super::types::{MediaInfo, TrackResult};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};
use url::Url;

const SPOTIFY_OEMBED_ENDPOINT: &str = "https://open.spotify.com/oembed";
const STREAM_ENDPOINT: &str = "https://cdn2.meow.gs/api/stream";

/// Fields of the oEmbed payload we care about; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct OembedMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// Fetches oEmbed metadata for a batch of Spotify track URLs with bounded
/// concurrency and synthesizes one MP3 stream descriptor per track.
pub struct MetadataFetcher {
    client: Client,
    endpoint: String,
    concurrency: usize,
}

impl MetadataFetcher {
    pub fn new(timeout: Duration, concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for metadata fetch")?;
        Ok(Self {
            client,
            endpoint: SPOTIFY_OEMBED_ENDPOINT.to_string(),
            concurrency,
        })
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Fetch metadata for every URL, producing exactly one result per input
    /// URL in input order. Per-item failures never abort the batch; they are
    /// logged and reflected in the returned records.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<TrackResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let endpoint = self.endpoint.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return TrackResult::failed(url),
                };
                fetch_single(&client, &endpoint, url).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (url, handle) in urls.iter().zip(handles) {
            match handle.await {
                Ok(track) => results.push(track),
                Err(e) => {
                    error!("Metadata task for {} failed: {}", url, e);
                    results.push(TrackResult::failed(url.clone()));
                }
            }
        }
        results
    }
}

async fn fetch_single(client: &Client, endpoint: &str, url: String) -> TrackResult {
    let Some(track_id) = extract_track_id(&url) else {
        warn!("Could not determine track ID from URL: {}", url);
        return TrackResult::failed(url);
    };

    let metadata = fetch_oembed_metadata(client, endpoint, &url).await;

    let title = metadata
        .title
        .unwrap_or_else(|| format!("Spotify Track {}", track_id));
    let thumbnail = metadata.thumbnail_url.unwrap_or_default();

    TrackResult {
        result_url: url.clone(),
        url,
        title,
        thumbnail,
        // oEmbed does not expose duration; left blank intentionally
        duration: String::new(),
        medias: vec![build_media_info(&track_id)],
        track_type: "single".to_string(),
        error: false,
    }
}

/// Degrades to empty metadata on any failure; a missing title or thumbnail
/// is not an error condition by itself.
async fn fetch_oembed_metadata(client: &Client, endpoint: &str, url: &str) -> OembedMetadata {
    let response = client
        .get(endpoint)
        .query(&[("url", url), ("format", "json")])
        .send()
        .await;

    match response {
        Ok(resp) if resp.status() == StatusCode::OK => match resp.json::<OembedMetadata>().await {
            Ok(metadata) => {
                debug!("oEmbed metadata for {}: {:?}", url, metadata);
                metadata
            }
            Err(e) => {
                error!("Failed to parse oEmbed response for {}: {}", url, e);
                OembedMetadata::default()
            }
        },
        Ok(resp) => {
            warn!(
                "Non-200 response from Spotify oEmbed for {}: {}",
                url,
                resp.status()
            );
            OembedMetadata::default()
        }
        Err(e) if e.is_timeout() => {
            error!("Timeout while fetching oEmbed metadata for {}", url);
            OembedMetadata::default()
        }
        Err(e) => {
            error!("HTTP error while fetching oEmbed metadata for {}: {}", url, e);
            OembedMetadata::default()
        }
    }
}

/// Extract the track id from standard Spotify track URLs like
/// `https://open.spotify.com/track/<id>?...`. Returns None when the path
/// does not start with the `track` keyword followed by an id.
fn extract_track_id(spotify_url: &str) -> Option<String> {
    let parsed = Url::parse(spotify_url).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    if segments.next()? != "track" {
        return None;
    }
    segments.next().map(|id| id.to_string())
}

/// Build the MP3 stream URL for a track id. The id is percent-encoded into
/// a fixed stream endpoint with a far-future expiry.
fn build_media_info(track_id: &str) -> MediaInfo {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id", track_id)
        .append_pair("source", "spotify")
        .append_pair("exp", "9999999999999")
        .finish();

    MediaInfo {
        url: format!("{STREAM_ENDPOINT}?{query}"),
        quality: "audio".to_string(),
        extension: "mp3".to_string(),
        media_type: "audio".to_string(),
    }
}
