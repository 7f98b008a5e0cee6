mod downloader;
mod fetcher;
mod types;

pub use downloader::AudioDownloader;
pub use fetcher::MetadataFetcher;
pub use types::{MediaInfo, TrackResult};
