// In-crate fakes for the external collaborators. Nothing here touches the
// network or needs yt-dlp/ffmpeg installed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use crate::api::{Track, TrackSource};
use crate::downloader::ytdlp::{DownloadRequest, MediaExtractor, VideoInfo};
use crate::errors::{AppError, Result};
use crate::search::SearchSource;

pub struct MockExtractor {
    probe: Option<VideoInfo>,
    searches: HashMap<String, Vec<VideoInfo>>,
    failing_queries: HashSet<String>,
    produced_ext: Option<&'static str>,
    fail_downloads: bool,
    transcoder: bool,
    probe_calls: AtomicUsize,
    search_calls: AtomicUsize,
    download_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    last_request: Mutex<Option<DownloadRequest>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            probe: None,
            searches: HashMap::new(),
            failing_queries: HashSet::new(),
            produced_ext: None,
            fail_downloads: false,
            transcoder: true,
            probe_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_probe(mut self, info: VideoInfo) -> Self {
        self.probe = Some(info);
        self
    }

    pub fn with_search(mut self, query: &str, entries: Vec<VideoInfo>) -> Self {
        self.searches.insert(query.to_string(), entries);
        self
    }

    pub fn failing_search(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }

    /// Downloads write `<template with ext>`.
    pub fn producing(mut self, ext: &'static str) -> Self {
        self.produced_ext = Some(ext);
        self
    }

    pub fn failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    pub fn without_transcoder(mut self) -> Self {
        self.transcoder = false;
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn searched_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<DownloadRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

pub fn entry(id: &str, title: &str) -> VideoInfo {
    VideoInfo {
        id: id.to_string(),
        title: Some(title.to_string()),
        channel: Some("Channel".to_string()),
        duration: Some(180.0),
        url: Some(format!("https://www.youtube.com/watch?v={}", id)),
        ..Default::default()
    }
}

#[async_trait]
impl MediaExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, _url: &str) -> Result<VideoInfo> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probe
            .clone()
            .ok_or_else(|| AppError::Extraction("mock probe failure".to_string()))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoInfo>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing_queries.contains(query) {
            return Err(AppError::Extraction("mock search failure".to_string()));
        }
        let mut entries = self.searches.get(query).cloned().unwrap_or_default();
        entries.truncate(limit);
        Ok(entries)
    }

    async fn download(&self, request: &DownloadRequest) -> Result<()> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail_downloads {
            return Err(AppError::Download("mock download failure".to_string()));
        }
        if let Some(ext) = self.produced_ext {
            let path = request.output_template.replace("%(ext)s", ext);
            std::fs::write(path, b"media")?;
        }
        Ok(())
    }

    fn has_transcoder(&self) -> bool {
        self.transcoder
    }
}

/// Search source with canned results and a call counter.
pub struct MockSource {
    name: &'static str,
    source: TrackSource,
    results: Vec<Track>,
    fail: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn returning(source: TrackSource, count: usize) -> Self {
        let results = (0..count)
            .map(|i| {
                Track::new(format!("{}-{}", source, i), format!("Track {}", i), format!("https://example.com/{}/{}", source, i), source)
            })
            .collect();
        Self {
            name: match source {
                TrackSource::Youtube => "mock-youtube",
                TrackSource::Spotify => "mock-spotify",
                TrackSource::Lyrics => "mock-lyrics",
            },
            source,
            results,
            fail: false,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty(source: TrackSource) -> Self {
        Self::returning(source, 0)
    }

    pub fn failing(source: TrackSource) -> Self {
        Self { fail: true, ..Self::empty(source) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(AppError::Search(format!("{} unavailable", self.source)));
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}
