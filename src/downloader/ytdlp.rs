use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use crate::api::MediaFormat;
use crate::config::AppConfig;
use crate::downloader::cache::MetadataCache;
use crate::errors::{AppError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const CACHE_CAPACITY: u64 = 1024;

/// Metadata yt-dlp reports for a video, a flat search entry or a probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub webpage_url: Option<String>,
    /// Flat-playlist entries carry their watch URL here.
    pub url: Option<String>,
    pub formats: Option<Vec<FormatInfo>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    pub height: Option<u32>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<f64>,
}

impl VideoInfo {
    pub fn duration_secs(&self) -> u64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u64)
            .unwrap_or(0)
    }

    /// `url`, then `webpage_url`, then a watch URL built from the id.
    pub fn resolved_url(&self) -> String {
        self.url
            .as_deref()
            .filter(|u| u.starts_with("http"))
            .or(self.webpage_url.as_deref().filter(|u| !u.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id))
    }

    /// `channel`, then `uploader`.
    pub fn attribution(&self) -> Option<&str> {
        self.channel
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.uploader.as_deref().filter(|u| !u.is_empty()))
    }
}

impl FormatInfo {
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize
            .or(self.filesize_approx.filter(|s| *s > 0.0).map(|s| s as u64))
    }
}

impl From<&FormatInfo> for MediaFormat {
    fn from(format: &FormatInfo) -> Self {
        MediaFormat {
            format_id: format.format_id.clone(),
            ext: format.ext.clone(),
            height: format.height,
            vcodec: format.vcodec.clone(),
            acodec: format.acodec.clone(),
            filesize: format.effective_size(),
        }
    }
}

/// Post-download audio extraction through the transcoder.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioExtraction {
    pub codec: String,
    pub bitrate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    /// yt-dlp format selector, e.g. `best[ext=mp4]/best`.
    pub format: String,
    /// Output template ending in `%(ext)s`.
    pub output_template: String,
    pub merge_output_format: Option<String>,
    pub extract_audio: Option<AudioExtraction>,
}

/// The general-purpose media extraction backend every adapter and the
/// video-search sources run on.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Full metadata for one URL, formats included, without downloading.
    async fn probe(&self, url: &str) -> Result<VideoInfo>;

    /// Flat video search, at most `limit` entries.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoInfo>>;

    async fn download(&self, request: &DownloadRequest) -> Result<()>;

    /// Whether an audio/video transcoder is available for post-processing.
    fn has_transcoder(&self) -> bool;
}

/// `yt-dlp` driven as a child process.
pub struct YtDlpBackend {
    ytdlp_path: String,
    ffmpeg_dir: Option<PathBuf>,
    proxy: Option<String>,
    probe_timeout: Duration,
    download_timeout: Duration,
    info_cache: MetadataCache<VideoInfo>,
    search_cache: MetadataCache<Vec<VideoInfo>>,
}

impl YtDlpBackend {
    pub fn new(config: &AppConfig) -> Self {
        let ffmpeg_dir = locate_ffmpeg(config.ffmpeg_location.as_deref());
        match &ffmpeg_dir {
            Some(dir) => log::info!("🎬 [YTDLP] ffmpeg found in {:?}", dir),
            None => log::warn!("⚠️ [YTDLP] ffmpeg not found - audio extraction will be unavailable"),
        }

        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            ffmpeg_dir,
            proxy: config.proxy.clone(),
            probe_timeout: Duration::from_secs(config.timeouts.probe_secs),
            download_timeout: Duration::from_secs(config.timeouts.download_secs),
            info_cache: MetadataCache::new(config.cache_ttl_secs, CACHE_CAPACITY),
            search_cache: MetadataCache::new(config.cache_ttl_secs, CACHE_CAPACITY),
        }
    }

    pub fn search_expression(query: &str, limit: usize) -> String {
        format!("ytsearch{}:{}", limit, query)
    }

    fn base_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--no-warnings",
            "--no-playlist",
            "--no-progress",
            "--socket-timeout", "30",
            "--retries", "3",
            "--user-agent", USER_AGENT,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if let Some(dir) = &self.ffmpeg_dir {
            args.push("--prefer-ffmpeg".to_string());
            args.push("--ffmpeg-location".to_string());
            args.push(dir.to_string_lossy().to_string());
        }
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args
    }

    pub fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = self.base_args();
        args.push("--quiet".to_string());
        args.push("--format".to_string());
        args.push(request.format.clone());
        args.push("--output".to_string());
        args.push(request.output_template.clone());

        if let Some(merge) = &request.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(merge.clone());
        }
        if let Some(audio) = &request.extract_audio {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push(audio.codec.clone());
            args.push("--audio-quality".to_string());
            args.push(format!("{}K", audio.bitrate));
        }

        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    async fn run(&self, args: &[String], timeout: Duration, tag: &str) -> Result<std::process::Output> {
        log::debug!("🚀 [{}] {} {}", tag, self.ytdlp_path, args.join(" "));

        let child = Command::new(&self.ytdlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AppError::ToolNotFound(self.ytdlp_path.clone()),
                _ => AppError::Io(e),
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                log::warn!("⏱️ [{}] yt-dlp did not finish within {:?}", tag, timeout);
                Err(AppError::Timeout(format!("yt-dlp after {:?}", timeout)))
            }
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlpBackend {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<VideoInfo> {
        let cache_key = format!("info:{}", url);
        if let Some(info) = self.info_cache.get(&cache_key).await {
            log::debug!("💾 [EXTRACT] Cache hit for {}", url);
            return Ok(info);
        }

        log::info!("🔍 [EXTRACT] Probing {}", url);
        let mut args = self.base_args();
        args.push("--dump-json".to_string());
        args.push("--skip-download".to_string());
        args.push("--".to_string());
        args.push(url.to_string());

        let output = self.run(&args, self.probe_timeout, "EXTRACT").await?;
        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Extraction(format!("yt-dlp probe failed: {}", error.trim())));
        }

        let json_output = String::from_utf8(output.stdout)
            .map_err(|e| AppError::Extraction(format!("Invalid UTF-8 in yt-dlp output: {}", e)))?;
        let line = json_output
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| AppError::Extraction("yt-dlp returned no metadata".to_string()))?;
        let info: VideoInfo = serde_json::from_str(line)?;

        self.info_cache.set(cache_key, info.clone()).await;
        Ok(info)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoInfo>> {
        let cache_key = format!("search:{}:{}", limit, query);
        if let Some(results) = self.search_cache.get(&cache_key).await {
            log::debug!("💾 [SEARCH] Cache hit for '{}'", query);
            return Ok(results);
        }

        let mut args = self.base_args();
        args.extend(
            ["--dump-json", "--flat-playlist", "--skip-download", "--ignore-errors", "--"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(Self::search_expression(query, limit));

        let output = self.run(&args, self.probe_timeout, "SEARCH").await?;
        let json_output = String::from_utf8_lossy(&output.stdout);

        // --ignore-errors can exit non-zero after printing usable entries.
        if !output.status.success() && json_output.trim().is_empty() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Extraction(format!("yt-dlp search failed: {}", error.trim())));
        }

        let results = parse_entries(&json_output);
        log::info!("📊 [SEARCH] '{}' -> {} entries", query, results.len());

        self.search_cache.set(cache_key, results.clone()).await;
        Ok(results)
    }

    async fn download(&self, request: &DownloadRequest) -> Result<()> {
        log::info!("⬇️ [DOWNLOAD] {} -> {}", request.url, request.output_template);
        let args = self.download_args(request);
        let output = self.run(&args, self.download_timeout, "DOWNLOAD").await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Download(format!("yt-dlp failed: {}", error.trim())));
        }
        Ok(())
    }

    fn has_transcoder(&self) -> bool {
        self.ffmpeg_dir.is_some()
    }
}

/// One JSON object per line; unparsable lines and id-less entries are skipped.
pub fn parse_entries(output: &str) -> Vec<VideoInfo> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<VideoInfo>(line) {
            Ok(info) if !info.id.is_empty() => Some(info),
            Ok(_) => None,
            Err(e) => {
                log::debug!("⚠️ [SEARCH] Skipping unparsable line: {}", e);
                None
            }
        })
        .collect()
}

fn ffmpeg_binary_name() -> &'static str {
    if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" }
}

/// Directory holding the ffmpeg binary: the configured file's parent, the
/// configured directory, or the first `PATH` entry that has one.
pub fn locate_ffmpeg(configured: Option<&Path>) -> Option<PathBuf> {
    let binary = ffmpeg_binary_name();

    if let Some(path) = configured {
        if path.is_file() {
            return path.parent().map(Path::to_path_buf);
        }
        if path.join(binary).is_file() {
            return Some(path.to_path_buf());
        }
        log::warn!("⚠️ [YTDLP] Configured ffmpeg location {:?} has no {}", path, binary);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find(|dir| dir.join(binary).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_search_output() {
        let output = concat!(
            r#"{"id":"a1","title":"Song","channel":"Artist","duration":201.4,"url":"https://www.youtube.com/watch?v=a1"}"#,
            "\n",
            "not json\n",
            r#"{"title":"no id"}"#,
            "\n",
            r#"{"id":"b2","title":null,"uploader":"Up","duration":null}"#,
            "\n"
        );
        let entries = parse_entries(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].duration_secs(), 201);
        assert_eq!(entries[0].attribution(), Some("Artist"));
        assert_eq!(entries[1].attribution(), Some("Up"));
        assert_eq!(entries[1].duration_secs(), 0);
        assert_eq!(entries[1].resolved_url(), "https://www.youtube.com/watch?v=b2");
    }

    #[test]
    fn format_size_prefers_exact() {
        let format = FormatInfo {
            filesize: None,
            filesize_approx: Some(1234.7),
            ..Default::default()
        };
        assert_eq!(format.effective_size(), Some(1234));
    }

    #[test]
    fn download_args_include_audio_postprocessing() {
        let mut config = AppConfig::default();
        config.ffmpeg_location = None;
        config.proxy = Some("socks5://127.0.0.1:1080".to_string());
        let backend = YtDlpBackend::new(&config);
        let request = DownloadRequest {
            url: "https://youtu.be/abc".to_string(),
            format: "bestaudio/best".to_string(),
            output_template: "/tmp/a.%(ext)s".to_string(),
            merge_output_format: None,
            extract_audio: Some(AudioExtraction { codec: "mp3".to_string(), bitrate: 192 }),
        };
        let args = backend.download_args(&request);
        assert!(args.windows(2).any(|w| w[0] == "--audio-format" && w[1] == "mp3"));
        assert!(args.windows(2).any(|w| w[0] == "--audio-quality" && w[1] == "192K"));
        assert!(args.windows(2).any(|w| w[0] == "--proxy" && w[1] == "socks5://127.0.0.1:1080"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn configured_ffmpeg_file_resolves_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join(ffmpeg_binary_name());
        std::fs::write(&binary, b"").unwrap();
        assert_eq!(locate_ffmpeg(Some(&binary)), Some(dir.path().to_path_buf()));
        assert_eq!(locate_ffmpeg(Some(dir.path())), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn search_expression_prefixes_limit() {
        assert_eq!(YtDlpBackend::search_expression("shape of you audio", 10), "ytsearch10:shape of you audio");
    }
}
