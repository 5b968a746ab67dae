use std::time::Duration;
use moka::future::Cache;
use moka::ops::compute::Op;
use serde::{Deserialize, Serialize};
use crate::api::{MultiSearchResult, Track, TrackSource};
use crate::downloader::Platform;

/// Results shown per page.
pub const PAGE_SIZE: usize = 10;
const MAX_SESSIONS: u64 = 10_000;

/// How a search bundle should be presented: downloadable YouTube results
/// first, then a Spotify link, then lyrics results, then nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchOutcome {
    Downloadable {
        source: TrackSource,
        tracks: Vec<Track>,
        spotify_hint: Option<Track>,
    },
    LinkOnly(Track),
    NothingFound,
}

impl Default for SearchOutcome {
    fn default() -> Self {
        Self::NothingFound
    }
}

impl SearchOutcome {
    pub fn from_bundle(bundle: &MultiSearchResult) -> Self {
        let first_link = bundle.spotify.iter().find(|t| !t.url.is_empty()).cloned();

        if !bundle.youtube.is_empty() {
            return Self::Downloadable {
                source: TrackSource::Youtube,
                tracks: bundle.youtube.clone(),
                spotify_hint: first_link,
            };
        }
        if let Some(track) = first_link {
            return Self::LinkOnly(track);
        }
        if !bundle.lyrics.is_empty() {
            return Self::Downloadable {
                source: TrackSource::Lyrics,
                tracks: bundle.lyrics.clone(),
                spotify_hint: None,
            };
        }
        Self::NothingFound
    }

    /// Tracks the user can pick from.
    pub fn tracks(&self) -> &[Track] {
        match self {
            Self::Downloadable { tracks, .. } => tracks,
            _ => &[],
        }
    }
}

/// A platform URL waiting for the user to choose a quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDownload {
    pub url: String,
    pub platform: Platform,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub query: String,
    pub page: usize,
    pub results: Vec<Track>,
    pub bundle: Option<MultiSearchResult>,
    pub pending: Option<PendingDownload>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SessionState {
    /// Replaces the search context and rewinds to the first page.
    pub fn record_search(&mut self, query: &str, bundle: MultiSearchResult) -> SearchOutcome {
        let outcome = SearchOutcome::from_bundle(&bundle);
        self.query = query.to_string();
        self.page = 0;
        self.results = outcome.tracks().to_vec();
        self.bundle = Some(bundle);
        outcome
    }

    pub fn page_count(&self) -> usize {
        (self.results.len() + PAGE_SIZE - 1) / PAGE_SIZE
    }

    pub fn page_slice(&self) -> &[Track] {
        let start = (self.page * PAGE_SIZE).min(self.results.len());
        let end = (start + PAGE_SIZE).min(self.results.len());
        &self.results[start..end]
    }

    /// Moves to `page`, clamped to the last page. Returns the page now shown.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.page = page.min(self.page_count().saturating_sub(1));
        self.page
    }

    /// Absolute index into the current results.
    pub fn select(&self, index: usize) -> Option<&Track> {
        self.results.get(index)
    }
}

/// Per-session state keyed by chat/session id, forgotten after `ttl` idle.
pub struct SessionStore {
    sessions: Cache<i64, SessionState>,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(Duration::from_secs(ttl_secs.max(1)))
            .build();
        Self { sessions }
    }

    pub async fn get(&self, session: i64) -> Option<SessionState> {
        self.sessions.get(&session).await
    }

    /// Applies `f` to the session (created empty if absent) and stores the
    /// result. Updates to one session are serialized.
    pub async fn update<F, R>(&self, session: i64, f: F) -> R
    where
        F: FnOnce(&mut SessionState) -> R,
        R: Default,
    {
        let mut result = None;
        self.sessions
            .entry(session)
            .and_compute_with(|current| {
                let mut state = current.map(|entry| entry.into_value()).unwrap_or_default();
                result = Some(f(&mut state));
                state.updated_at = Some(chrono::Utc::now());
                std::future::ready(Op::Put(state))
            })
            .await;
        result.unwrap_or_default()
    }

    pub async fn record_search(&self, session: i64, query: &str, bundle: MultiSearchResult) -> SearchOutcome {
        self.update(session, |state| state.record_search(query, bundle)).await
    }

    pub async fn set_pending(&self, session: i64, pending: PendingDownload) {
        self.update(session, |state| state.pending = Some(pending)).await
    }

    pub async fn take_pending(&self, session: i64) -> Option<PendingDownload> {
        self.update(session, |state| state.pending.take()).await
    }
}
