//! Song identification around an opaque fingerprint recognizer: cut a short
//! mono snippet out of the sample, hand it to the recognizer, then look the
//! match up through the regular multi-source search.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use crate::api::MultiSearchResult;
use crate::errors::{AppError, Result};
use crate::search::SearchEngine;

/// Length of the snippet sent to the recognizer.
pub const SNIPPET_SECS: f64 = 12.0;
const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizedSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub url: String,
    pub cover: String,
}

impl RecognizedSong {
    /// Text fed to the multi-source search for a match.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.artist, self.title).trim().to_string()
    }
}

/// Acoustic fingerprint lookup. `Ok(None)` means the sample matched nothing.
#[async_trait]
pub trait SongRecognizer: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, snippet: &Path) -> Result<Option<RecognizedSong>>;
}

/// Recognizer backed by an external program invoked as `<command> <snippet>`.
/// It prints a [`RecognizedSong`] JSON object, or nothing / `null` for no match.
pub struct CommandRecognizer {
    command: String,
    timeout: Duration,
}

impl CommandRecognizer {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self { command: command.into(), timeout }
    }
}

#[async_trait]
impl SongRecognizer for CommandRecognizer {
    fn name(&self) -> &str {
        &self.command
    }

    async fn recognize(&self, snippet: &Path) -> Result<Option<RecognizedSong>> {
        let child = Command::new(&self.command)
            .arg(snippet)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AppError::ToolNotFound(self.command.clone()),
                _ => AppError::Io(e),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| AppError::Timeout(format!("recognizer after {:?}", self.timeout)))??;

        if !output.status.success() {
            return Err(AppError::Api(format!(
                "recognizer failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_recognizer_output(&String::from_utf8_lossy(&output.stdout))
    }
}

pub fn parse_recognizer_output(stdout: &str) -> Result<Option<RecognizedSong>> {
    let stdout = stdout.trim();
    if stdout.is_empty() || stdout == "null" {
        return Ok(None);
    }
    let song: RecognizedSong = serde_json::from_str(stdout)?;
    Ok((!song.title.trim().is_empty()).then_some(song))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnippetWindow {
    pub start: f64,
    pub length: f64,
}

/// A [`SNIPPET_SECS`] window centred in the sample, or the whole sample when
/// it is shorter. Unknown durations start at zero.
pub fn snippet_window(duration: Option<f64>) -> SnippetWindow {
    match duration.filter(|d| d.is_finite() && *d > 0.0) {
        Some(d) if d <= SNIPPET_SECS => SnippetWindow { start: 0.0, length: d },
        Some(d) => SnippetWindow { start: (d - SNIPPET_SECS) / 2.0, length: SNIPPET_SECS },
        None => SnippetWindow { start: 0.0, length: SNIPPET_SECS },
    }
}

/// Cuts recognizer-ready snippets (mono, 44.1 kHz, 16-bit WAV) with ffmpeg.
pub struct SnippetPreparer {
    ffmpeg: Option<PathBuf>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl SnippetPreparer {
    /// `ffmpeg_dir` is the directory holding the ffmpeg binary.
    pub fn new(ffmpeg_dir: Option<PathBuf>, timeout: Duration) -> Self {
        let binary = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        Self {
            ffmpeg: ffmpeg_dir.map(|dir| dir.join(binary)),
            output_dir: std::env::temp_dir(),
            timeout,
        }
    }

    pub fn ffmpeg_args(input: &Path, output: &Path, window: SnippetWindow) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", window.start),
            "-t".to_string(),
            format!("{:.3}", window.length),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-sample_fmt".to_string(),
            "s16".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Path of the prepared snippet, or `None` when the input is missing,
    /// ffmpeg is unavailable, or conversion fails.
    pub async fn prepare(&self, input: &Path, duration: Option<f64>) -> Option<PathBuf> {
        if !input.is_file() {
            log::warn!("⚠️ [RECOGNIZE] Sample {:?} does not exist", input);
            return None;
        }
        let Some(ffmpeg) = &self.ffmpeg else {
            log::warn!("⚠️ [RECOGNIZE] ffmpeg not available, cannot prepare snippet");
            return None;
        };

        let output = self.output_dir.join(format!("snippet_{}.wav", uuid::Uuid::new_v4().simple()));
        let args = Self::ffmpeg_args(input, &output, snippet_window(duration));

        let result: Result<()> = async {
            let child = Command::new(ffmpeg)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()?;
            let finished = tokio::time::timeout(self.timeout, child.wait_with_output())
                .await
                .map_err(|_| AppError::Timeout(format!("ffmpeg after {:?}", self.timeout)))??;
            if finished.status.success() {
                Ok(())
            } else {
                Err(AppError::Extraction(String::from_utf8_lossy(&finished.stderr).trim().to_string()))
            }
        }
        .await;

        match result {
            Ok(()) if output.is_file() => Some(output),
            Ok(()) => None,
            Err(e) => {
                log::warn!("⚠️ [RECOGNIZE] Snippet preparation failed: {}", e);
                let _ = tokio::fs::remove_file(&output).await;
                None
            }
        }
    }
}

/// A recognized song and what the multi-source search found for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub song: RecognizedSong,
    pub results: MultiSearchResult,
}

pub struct SongIdentifier {
    preparer: SnippetPreparer,
    recognizer: std::sync::Arc<dyn SongRecognizer>,
}

impl SongIdentifier {
    pub fn new(preparer: SnippetPreparer, recognizer: std::sync::Arc<dyn SongRecognizer>) -> Self {
        Self { preparer, recognizer }
    }

    pub async fn identify(&self, sample: &Path, duration: Option<f64>, engine: &SearchEngine) -> Option<Identification> {
        let snippet = self.preparer.prepare(sample, duration).await?;
        self.identify_snippet(&snippet, engine).await
    }

    /// Recognizes an already prepared snippet, which is deleted afterwards.
    pub async fn identify_snippet(&self, snippet: &Path, engine: &SearchEngine) -> Option<Identification> {
        let recognized = self.recognizer.recognize(snippet).await;
        if let Err(e) = tokio::fs::remove_file(snippet).await {
            log::debug!("🧹 [RECOGNIZE] Could not remove {:?}: {}", snippet, e);
        }

        let song = match recognized {
            Ok(Some(song)) => song,
            Ok(None) => {
                log::info!("🎤 [RECOGNIZE] No match from {}", self.recognizer.name());
                return None;
            }
            Err(e) => {
                log::warn!("⚠️ [RECOGNIZE] {} failed: {}", self.recognizer.name(), e);
                return None;
            }
        };

        log::info!("🎤 [RECOGNIZE] Matched '{}' by '{}'", song.title, song.artist);
        let results = engine.multi_search(&song.search_query()).await;
        Some(Identification { song, results })
    }
}
