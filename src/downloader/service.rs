use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use crate::api::{MediaFormat, MediaInfo, QualityHeight, QualityOption};
use crate::downloader::platform::Platform;
use crate::downloader::ytdlp::{AudioExtraction, DownloadRequest, MediaExtractor, VideoInfo};
use crate::downloader::Downloader;
use crate::errors::{AppError, Result};
use crate::security::InputValidator;
use crate::utils::ensure_dir_exists;

/// Heights offered for multi-resolution platforms.
pub const VIDEO_HEIGHTS: [u32; 6] = [144, 240, 360, 480, 720, 1080];

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mkv"];
const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "m4a", "ogg"];
const OUTPUT_TEMPLATE_EXT: &str = "%(ext)s";

/// Per-platform settings. Placeholders fill in fields a sparse probe leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub multi_resolution: bool,
    pub default_title: &'static str,
    pub default_channel: &'static str,
    pub default_id: &'static str,
}

/// Adapter registry in detection priority order.
pub const PLATFORM_PROFILES: [PlatformProfile; 5] = [
    PlatformProfile {
        platform: Platform::Youtube,
        multi_resolution: true,
        default_title: "Video",
        default_channel: "",
        default_id: "video",
    },
    PlatformProfile {
        platform: Platform::Instagram,
        multi_resolution: false,
        default_title: "Instagram Video",
        default_channel: "Instagram",
        default_id: "instagram",
    },
    PlatformProfile {
        platform: Platform::TikTok,
        multi_resolution: false,
        default_title: "TikTok Video",
        default_channel: "TikTok",
        default_id: "tiktok",
    },
    PlatformProfile {
        platform: Platform::Snapchat,
        multi_resolution: false,
        default_title: "Snapchat Video",
        default_channel: "Snapchat",
        default_id: "snapchat",
    },
    PlatformProfile {
        platform: Platform::Likee,
        multi_resolution: false,
        default_title: "Likee Video",
        default_channel: "Likee",
        default_id: "likee",
    },
];

/// The one downloader implementation, configured per platform by a [`PlatformProfile`].
/// Holds no per-request state, so one instance serves concurrent requests.
pub struct PlatformDownloader {
    profile: PlatformProfile,
    name: String,
    extractor: Arc<dyn MediaExtractor>,
    audio_bitrate: u32,
    validator: InputValidator,
}

impl PlatformDownloader {
    pub fn new(profile: PlatformProfile, extractor: Arc<dyn MediaExtractor>, audio_bitrate: u32) -> Self {
        Self {
            name: format!("{} downloader", profile.platform.display_name()),
            profile,
            extractor,
            audio_bitrate,
            validator: InputValidator::new(),
        }
    }

    fn to_media_info(&self, url: &str, info: VideoInfo) -> MediaInfo {
        let title = info
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.profile.default_title)
            .to_string();
        let channel = info
            .attribution()
            .unwrap_or(self.profile.default_channel)
            .to_string();
        let id = if info.id.is_empty() { self.profile.default_id.to_string() } else { info.id.clone() };
        let formats = if self.profile.multi_resolution {
            info.formats
                .as_ref()
                .map(|formats| formats.iter().map(MediaFormat::from).collect())
        } else {
            None
        };

        MediaInfo {
            id,
            title,
            channel,
            thumbnail: info.thumbnail.clone().filter(|t| !t.is_empty()),
            duration: info.duration_secs(),
            url: url.to_string(),
            formats,
        }
    }

    pub fn video_request(&self, url: &str, template: String, quality: Option<QualityHeight>) -> DownloadRequest {
        let format = match quality {
            Some(QualityHeight::Pixels(height)) if self.profile.multi_resolution => {
                format!("best[height<={h}][ext=mp4]/best[height<={h}]/best", h = height)
            }
            _ => "best[ext=mp4]/best".to_string(),
        };

        DownloadRequest {
            url: url.to_string(),
            format,
            output_template: template,
            merge_output_format: self.profile.multi_resolution.then(|| "mp4".to_string()),
            extract_audio: None,
        }
    }

    pub fn audio_request(&self, url: &str, template: String) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            format: "bestaudio/best".to_string(),
            output_template: template,
            merge_output_format: None,
            extract_audio: Some(AudioExtraction {
                codec: "mp3".to_string(),
                bitrate: self.audio_bitrate,
            }),
        }
    }

    /// Validates `output_path`, creates its parent and returns the backend template.
    async fn prepare_output(&self, output_path: &Path) -> Result<String> {
        self.validator.validate_output_path(output_path)?;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent).await?;
        }
        Ok(output_template(output_path))
    }

    async fn fetch(&self, request: DownloadRequest, output_path: &Path, extensions: &[&str]) -> Result<PathBuf> {
        self.extractor.download(&request).await?;
        find_output(output_path, extensions).ok_or_else(|| {
            AppError::Download(format!("no output file found for {:?}", output_path))
        })
    }
}

#[async_trait]
impl Downloader for PlatformDownloader {
    fn platform(&self) -> Platform {
        self.profile.platform
    }

    async fn get_info(&self, url: &str) -> Option<MediaInfo> {
        match self.extractor.probe(url).await {
            Ok(info) => Some(self.to_media_info(url, info)),
            Err(e) => {
                log::warn!("⚠️ [{}] Probe failed for {}: {}", self.profile.platform.id().to_uppercase(), url, e);
                None
            }
        }
    }

    async fn get_available_qualities(&self, url: &str) -> Vec<QualityOption> {
        if !self.profile.multi_resolution {
            return vec![QualityOption::video(), QualityOption::audio(0)];
        }

        match self.get_info(url).await {
            Some(info) => qualities_from_formats(info.formats.as_deref().unwrap_or_default()),
            None => vec![QualityOption::audio(0)],
        }
    }

    async fn download_video(&self, url: &str, output_path: &Path, quality: Option<QualityHeight>) -> Option<PathBuf> {
        let tag = self.profile.platform.id().to_uppercase();
        let result = async {
            let template = self.prepare_output(output_path).await?;
            let request = self.video_request(url, template, quality);
            self.fetch(request, output_path, &VIDEO_EXTENSIONS).await
        }
        .await;

        match result {
            Ok(path) => {
                log::info!("✅ [{}] Video saved to {:?}", tag, path);
                Some(path)
            }
            Err(e) => {
                log::warn!("⚠️ [{}] Video download failed for {}: {}", tag, url, e);
                None
            }
        }
    }

    async fn download_audio(&self, url: &str, output_path: &Path) -> Option<PathBuf> {
        let tag = self.profile.platform.id().to_uppercase();
        if !self.extractor.has_transcoder() {
            log::warn!("⚠️ [{}] Audio extraction needs ffmpeg, none available", tag);
            return None;
        }

        let result = async {
            let template = self.prepare_output(output_path).await?;
            let request = self.audio_request(url, template);
            self.fetch(request, output_path, &AUDIO_EXTENSIONS).await
        }
        .await;

        match result {
            Ok(path) => {
                log::info!("✅ [{}] Audio saved to {:?}", tag, path);
                Some(path)
            }
            Err(e) => {
                log::warn!("⚠️ [{}] Audio download failed for {}: {}", tag, url, e);
                None
            }
        }
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}

/// Distinct supported heights ascending, then the `Audio` entry sized after
/// the first audio-only format.
pub fn qualities_from_formats(formats: &[MediaFormat]) -> Vec<QualityOption> {
    let mut options: Vec<QualityOption> = Vec::new();
    for format in formats.iter().filter(|f| f.is_video()) {
        let Some(height) = format.height else { continue };
        if !VIDEO_HEIGHTS.contains(&height) {
            continue;
        }
        if options.iter().any(|o| o.height == QualityHeight::Pixels(height)) {
            continue;
        }
        options.push(QualityOption::pixels(height, format.filesize.unwrap_or(0)));
    }
    options.sort_by_key(|o| match o.height {
        QualityHeight::Pixels(h) => h,
        _ => u32::MAX,
    });

    let audio_size = formats
        .iter()
        .find(|f| f.is_audio_only())
        .and_then(|f| f.filesize)
        .unwrap_or(0);
    options.push(QualityOption::audio(audio_size));
    options
}

/// `output_path` with its extension swapped for the backend placeholder.
pub fn output_template(output_path: &Path) -> String {
    output_path
        .with_extension(OUTPUT_TEMPLATE_EXT)
        .to_string_lossy()
        .to_string()
}

/// First existing sibling of `output_path` among `extensions`.
pub fn find_output(output_path: &Path, extensions: &[&str]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| output_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
