use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::errors::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub download_dir: PathBuf,
    pub ytdlp_path: String,
    pub ffmpeg_location: Option<PathBuf>,
    pub proxy: Option<String>,
    /// External song recognizer: program run with the snippet path, printing JSON.
    pub recognizer_command: Option<String>,
    pub audio_quality: AudioQuality,
    pub spotify: SpotifyConfig,
    pub search: SearchConfig,
    pub timeouts: TimeoutConfig,
    pub worker: WorkerConfig,
    pub cache_ttl_secs: u64,
    pub session_ttl_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub market: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub youtube_limit: usize,
    pub spotify_limit: usize,
    pub lyrics_limit: usize,
    pub source_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutConfig {
    pub probe_secs: u64,
    pub download_secs: u64,
    pub http_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WorkerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioQuality {
    Low,    // 128 kbps
    #[default]
    Medium, // 192 kbps
    High,   // 256 kbps
    Best,   // 320 kbps
}

impl AudioQuality {
    pub fn bitrate(&self) -> u32 {
        match self {
            AudioQuality::Low => 128,
            AudioQuality::Medium => 192,
            AudioQuality::High => 256,
            AudioQuality::Best => 320,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir()
                .map(|dir| dir.join("mediaseek"))
                .unwrap_or_else(|| PathBuf::from("./downloads")),
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_location: None,
            proxy: None,
            recognizer_command: None,
            audio_quality: AudioQuality::default(),
            spotify: SpotifyConfig::default(),
            search: SearchConfig::default(),
            timeouts: TimeoutConfig::default(),
            worker: WorkerConfig::default(),
            cache_ttl_secs: 600,
            session_ttl_secs: 1800,
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            market: "UZ".to_string(),
        }
    }
}

impl SpotifyConfig {
    /// Both halves of the client-credentials pair, or `None` when either is blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let secret = self.client_secret.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((id, secret))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            youtube_limit: 10,
            spotify_limit: 5,
            lyrics_limit: 10,
            source_timeout_secs: 60,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 30,
            download_secs: 600,
            http_secs: 20,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

impl AppConfig {
    /// Loads from the default config file location plus the environment.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path();
        Self::load_from(path.as_deref())
    }

    /// Defaults, then the optional file, then `MEDIASEEK_*` variables, then the
    /// well-known credential/tool variables.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            log::info!("📄 [CONFIG] Reading configuration from {:?}", path);
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MEDIASEEK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlays `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, `FFMPEG_PATH`,
    /// `YTDLP_PATH` and `RECOGNIZER_COMMAND`. Blank values count as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(id) = read("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(id);
        }
        if let Some(secret) = read("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(secret);
        }
        if let Some(ffmpeg) = read("FFMPEG_PATH") {
            self.ffmpeg_location = Some(PathBuf::from(ffmpeg));
        }
        if let Some(ytdlp) = read("YTDLP_PATH") {
            self.ytdlp_path = ytdlp;
        }
        if let Some(recognizer) = read("RECOGNIZER_COMMAND") {
            self.recognizer_command = Some(recognizer);
        }
    }

    fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mediaseek").join("config.json"))
    }
}
