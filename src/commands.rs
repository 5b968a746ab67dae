use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::api::{MediaInfo, QualityHeight, QualityOption, Track};
use crate::config::AppConfig;
use crate::downloader::http_pool::HttpPool;
use crate::downloader::ytdlp::locate_ffmpeg;
use crate::downloader::{Downloader, DownloaderFactory, MediaExtractor, Platform, YtDlpBackend};
use crate::errors::{AppError, Result};
use crate::recognition::{CommandRecognizer, Identification, SnippetPreparer, SongIdentifier, SongRecognizer};
use crate::search::{LyricsSearch, PendingDownload, SearchEngine, SearchOutcome, SearchSource, SessionStore, SpotifySearch, YoutubeMusicSearch};
use crate::security::InputValidator;
use crate::utils::{ensure_dir_exists, unique_output_path};
use crate::worker::WorkerPool;

/// What a piece of user text turned into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Resolution {
    Media {
        platform: Platform,
        info: Option<MediaInfo>,
        qualities: Vec<QualityOption>,
    },
    Search(SearchOutcome),
}

// State management
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub factory: Arc<DownloaderFactory>,
    pub engine: Arc<SearchEngine>,
    pub sessions: SessionStore,
    pub workers: WorkerPool,
    identifier: Option<Arc<SongIdentifier>>,
    validator: InputValidator,
}

impl AppState {
    /// Production wiring: yt-dlp backend, Spotify over HTTP, optional
    /// external recognizer.
    pub fn new(config: AppConfig) -> Result<Self> {
        let extractor: Arc<dyn MediaExtractor> = Arc::new(YtDlpBackend::new(&config));

        let mut http = HttpPool::new(config.timeouts.http_secs)?;
        if let Some(proxy) = &config.proxy {
            http = http.with_proxy(proxy)?;
        }
        let spotify: Arc<dyn SearchSource> = Arc::new(SpotifySearch::new(http, &config.spotify));

        let recognizer = config.recognizer_command.as_ref().map(|command| {
            Arc::new(CommandRecognizer::new(command.clone(), Duration::from_secs(config.timeouts.probe_secs * 2)))
                as Arc<dyn SongRecognizer>
        });

        Ok(Self::with_components(config, extractor, spotify, recognizer))
    }

    pub fn with_components(
        config: AppConfig,
        extractor: Arc<dyn MediaExtractor>,
        spotify: Arc<dyn SearchSource>,
        recognizer: Option<Arc<dyn SongRecognizer>>,
    ) -> Self {
        let engine = SearchEngine::new(
            Arc::new(YoutubeMusicSearch::new(extractor.clone())),
            spotify,
            Arc::new(LyricsSearch::new(extractor.clone())),
            config.search.clone(),
        );
        let factory = DownloaderFactory::new(extractor, &config);

        let identifier = recognizer.map(|recognizer| {
            let preparer = SnippetPreparer::new(
                locate_ffmpeg(config.ffmpeg_location.as_deref()),
                Duration::from_secs(config.timeouts.probe_secs),
            );
            Arc::new(SongIdentifier::new(preparer, recognizer))
        });

        Self {
            sessions: SessionStore::new(config.session_ttl_secs),
            workers: WorkerPool::new(config.worker.workers, config.worker.queue_capacity),
            engine: Arc::new(engine),
            factory: Arc::new(factory),
            identifier,
            validator: InputValidator::new(),
            config: Arc::new(config),
        }
    }

    pub async fn search(&self, session: i64, query: &str) -> Result<SearchOutcome> {
        let engine = self.engine.clone();
        let owned = query.to_string();
        let bundle = self.workers.submit(async move { engine.multi_search(&owned).await }).await?.wait().await?;
        Ok(self.sessions.record_search(session, query.trim(), bundle).await)
    }

    pub fn detect(&self, url: &str) -> Platform {
        self.factory.detect_platform(url)
    }

    /// The adapter for the first platform link in `text`, plus that link
    /// cut out of any surrounding words and given a scheme when it had none.
    fn downloader_for(&self, text: &str) -> Option<(String, Arc<dyn Downloader>)> {
        let downloader = self.factory.get_downloader(text)?;
        let found = downloader.platform().find_link(text)?;
        let link = if found.contains("://") { found.to_string() } else { format!("https://{}", found) };
        self.validator.validate_url(&link).ok()?;
        Some((link, downloader))
    }

    pub async fn media_info(&self, url: &str) -> Result<Option<MediaInfo>> {
        let Some((url, downloader)) = self.downloader_for(url) else {
            return Ok(None);
        };
        self.workers.submit(async move { downloader.get_info(&url).await }).await?.wait().await
    }

    pub async fn qualities(&self, url: &str) -> Result<Vec<QualityOption>> {
        let Some((url, downloader)) = self.downloader_for(url) else {
            return Ok(Vec::new());
        };
        self.workers
            .submit(async move { downloader.get_available_qualities(&url).await })
            .await?
            .wait()
            .await
    }

    /// Downloads `url` to `output`, or to a fresh file in the download directory.
    pub async fn download(
        &self,
        url: &str,
        audio: bool,
        quality: Option<QualityHeight>,
        output: Option<PathBuf>,
    ) -> Result<Option<PathBuf>> {
        let Some((url, downloader)) = self.downloader_for(url) else {
            log::warn!("⚠️ [DOWNLOAD] No downloader for {}", url);
            return Ok(None);
        };

        let output = match output {
            Some(path) => path,
            None => {
                ensure_dir_exists(&self.config.download_dir).await?;
                let ext = if audio { "mp3" } else { "mp4" };
                unique_output_path(&self.config.download_dir, downloader.platform().id(), ext)
            }
        };

        let audio = audio || quality == Some(QualityHeight::Audio);
        self.workers
            .submit(async move {
                if audio {
                    downloader.download_audio(&url, &output).await
                } else {
                    downloader.download_video(&url, &output, quality).await
                }
            })
            .await?
            .wait()
            .await
    }

    /// A URL of a known platform becomes a pending download, anything else a search.
    pub async fn resolve(&self, session: i64, text: &str) -> Result<Resolution> {
        let text = text.trim();
        if let Some((link, downloader)) = self.downloader_for(text) {
            let platform = downloader.platform();
            log::info!("🔗 [RESOLVE] {} link from session {}", platform, session);

            let info = self.media_info(&link).await?;
            let qualities = self.qualities(&link).await?;
            self.sessions
                .set_pending(session, PendingDownload {
                    url: link,
                    platform,
                    title: info.as_ref().map(|i| i.title.clone()).unwrap_or_default(),
                })
                .await;
            return Ok(Resolution::Media { platform, info, qualities });
        }

        Ok(Resolution::Search(self.search(session, text).await?))
    }

    /// Results on `page` (clamped) of the session's last search.
    pub async fn page(&self, session: i64, page: usize) -> Vec<Track> {
        self.sessions
            .update(session, |state| {
                state.set_page(page);
                state.page_slice().to_vec()
            })
            .await
    }

    /// Fetches the audio of result `index` of the session's last search.
    pub async fn download_selection(&self, session: i64, index: usize, output: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let track = self
            .sessions
            .get(session)
            .await
            .and_then(|state| state.select(index).cloned());
        match track {
            Some(track) => self.download(&track.url, true, None, output).await,
            None => Err(AppError::Validation(format!("no search result at index {}", index))),
        }
    }

    /// Completes the session's pending platform download at `quality`.
    pub async fn download_pending(&self, session: i64, quality: QualityHeight, output: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let pending = self
            .sessions
            .take_pending(session)
            .await
            .ok_or_else(|| AppError::Validation("no pending download".to_string()))?;
        self.download(&pending.url, quality == QualityHeight::Audio, Some(quality), output).await
    }

    pub async fn identify(&self, sample: &Path, duration: Option<f64>) -> Result<Option<Identification>> {
        let identifier = self
            .identifier
            .clone()
            .ok_or_else(|| AppError::ToolNotFound("no song recognizer configured".to_string()))?;
        let engine = self.engine.clone();
        let sample = sample.to_path_buf();
        self.workers
            .submit(async move { identifier.identify(&sample, duration, &engine).await })
            .await?
            .wait()
            .await
    }

    pub async fn shutdown(&self) {
        self.workers.shutdown().await;
    }
}
