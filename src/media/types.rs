use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One retrievable binary stream for a track. Built synthetically from the
/// track id, never sourced from the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub url: String,
    pub quality: String,
    pub extension: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// Outcome of one input URL. Stages pass these by value: the fetcher builds
/// them, the downloader consumes the list and returns it with `error` flags
/// updated, the exporter reads the final list.
#[derive(Debug, Clone)]
pub struct TrackResult {
    pub url: String,
    pub result_url: String,
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub medias: Vec<MediaInfo>,
    pub track_type: String,
    pub error: bool,
}

impl TrackResult {
    /// Record for a URL whose track id could not be determined, or whose
    /// processing task failed outright. No medias, error flagged.
    pub fn failed(url: String) -> Self {
        Self {
            result_url: url.clone(),
            url,
            title: "Spotify Track unknown".to_string(),
            thumbnail: String::new(),
            duration: String::new(),
            medias: Vec::new(),
            track_type: "single".to_string(),
            error: true,
        }
    }

    /// Nested JSON shape used by the structured export:
    /// `{"url": ..., "result": {"url", "title", ..., "medias", "type", "error"}}`.
    pub fn to_value(&self) -> Value {
        json!({
            "url": self.url,
            "result": {
                "url": self.result_url,
                "title": self.title,
                "thumbnail": self.thumbnail,
                "duration": self.duration,
                "medias": self.medias,
                "type": self.track_type,
                "error": self.error,
            },
        })
    }
}
