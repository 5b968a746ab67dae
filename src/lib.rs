pub mod api;
pub mod commands;
pub mod config;
pub mod downloader;
pub mod errors;
pub mod recognition;
pub mod search;
pub mod security;
pub mod utils;
pub mod worker;

#[cfg(test)]
mod testing;

pub use api::{MediaInfo, MultiSearchResult, QualityHeight, QualityOption, Track, TrackSource};
pub use commands::{AppState, Resolution};
pub use config::AppConfig;
pub use downloader::{detect_platform, Downloader, DownloaderFactory, Platform};
pub use errors::{AppError, Result};
pub use search::{SearchEngine, SearchOutcome};
