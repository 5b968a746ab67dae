pub mod cache;
pub mod factory;
pub mod http_pool;
pub mod platform;
pub mod service;
pub mod ytdlp;

pub use factory::DownloaderFactory;
pub use platform::{detect_platform, Platform, PLATFORM_ORDER};
pub use service::{PlatformDownloader, PlatformProfile};
pub use ytdlp::{DownloadRequest, MediaExtractor, VideoInfo, YtDlpBackend};

use std::path::{Path, PathBuf};
use crate::api::{MediaInfo, QualityHeight, QualityOption};

/// Uniform capability every platform adapter offers.
///
/// Every operation is fault-isolated: extraction, network and tooling
/// failures are logged and come back as `None` or an empty list.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    fn platform(&self) -> Platform;

    /// Pure pattern match, no network call.
    fn detect(&self, url: &str) -> bool {
        self.platform().matches(url)
    }

    async fn get_info(&self, url: &str) -> Option<MediaInfo>;

    /// Ascending video entries followed by exactly one `Audio` entry.
    async fn get_available_qualities(&self, url: &str) -> Vec<QualityOption>;

    /// `quality` is a resolution ceiling for multi-resolution platforms and
    /// ignored elsewhere.
    async fn download_video(&self, url: &str, output_path: &Path, quality: Option<QualityHeight>) -> Option<PathBuf>;

    async fn download_audio(&self, url: &str, output_path: &Path) -> Option<PathBuf>;

    fn get_name(&self) -> &str;
}
