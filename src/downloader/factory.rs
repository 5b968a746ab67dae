use std::sync::Arc;
use crate::config::AppConfig;
use crate::downloader::platform::{detect_platform, Platform};
use crate::downloader::service::{PlatformDownloader, PLATFORM_PROFILES};
use crate::downloader::ytdlp::MediaExtractor;
use crate::downloader::Downloader;

/// Picks the adapter for a URL by scanning the registry in priority order.
pub struct DownloaderFactory {
    downloaders: Vec<Arc<dyn Downloader>>,
}

impl DownloaderFactory {
    pub fn new(extractor: Arc<dyn MediaExtractor>, config: &AppConfig) -> Self {
        let bitrate = config.audio_quality.bitrate();
        let downloaders = PLATFORM_PROFILES
            .iter()
            .map(|profile| Arc::new(PlatformDownloader::new(*profile, extractor.clone(), bitrate)) as Arc<dyn Downloader>)
            .collect::<Vec<_>>();

        log::info!("🏭 [FACTORY] {} downloaders registered on {}", downloaders.len(), extractor.name());
        Self { downloaders }
    }

    /// First adapter whose pattern matches, or `None` for free text and
    /// unsupported sites.
    pub fn get_downloader(&self, url: &str) -> Option<Arc<dyn Downloader>> {
        self.downloaders.iter().find(|d| d.detect(url)).cloned()
    }

    pub fn detect_platform(&self, url: &str) -> Platform {
        detect_platform(url)
    }

    pub fn downloaders(&self) -> &[Arc<dyn Downloader>] {
        &self.downloaders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExtractor;
    use crate::downloader::PLATFORM_ORDER;

    fn factory() -> (DownloaderFactory, Arc<MockExtractor>) {
        let extractor = Arc::new(MockExtractor::new());
        (DownloaderFactory::new(extractor.clone(), &AppConfig::default()), extractor)
    }

    #[tokio::test]
    async fn tiktok_short_link_resolves_to_tiktok_adapter() {
        let (factory, extractor) = factory();
        let url = "https://vm.tiktok.com/ABC123/";
        assert_eq!(factory.detect_platform(url), Platform::TikTok);

        let downloader = factory.get_downloader(url).expect("tiktok adapter");
        assert_eq!(downloader.platform(), Platform::TikTok);
        assert_eq!(downloader.get_name(), "TikTok downloader");

        let qualities = downloader.get_available_qualities(url).await;
        let labels: Vec<&str> = qualities.iter().map(|q| q.label.as_str()).collect();
        assert_eq!(labels, vec!["Video", "Audio"]);
        assert_eq!(extractor.probe_calls(), 0);
    }

    #[test]
    fn registry_follows_detection_order() {
        let (factory, _) = factory();
        let platforms: Vec<Platform> = factory.downloaders().iter().map(|d| d.platform()).collect();
        assert_eq!(platforms, PLATFORM_ORDER.to_vec());
    }

    #[test]
    fn free_text_has_no_downloader() {
        let (factory, _) = factory();
        assert!(factory.get_downloader("shape of you").is_none());
        assert_eq!(factory.detect_platform("shape of you"), Platform::Other);
    }

    #[tokio::test]
    async fn single_rendition_adapters_offer_two_options() {
        let (factory, _) = factory();
        for url in [
            "https://www.instagram.com/reel/abc/",
            "https://vm.tiktok.com/ABC123/",
            "https://t.snapchat.com/xyz",
            "https://l.likee.video/v/abc",
        ] {
            let downloader = factory.get_downloader(url).unwrap();
            let qualities = downloader.get_available_qualities(url).await;
            assert_eq!(qualities.len(), 2, "{}", url);
            assert_eq!(qualities.last().map(|q| q.label.as_str()), Some("Audio"));
        }
    }
}
