pub mod engine;
pub mod lyrics;
pub mod session;
pub mod spotify;
pub mod youtube_music;

pub use engine::SearchEngine;
pub use lyrics::LyricsSearch;
pub use session::{PendingDownload, SearchOutcome, SessionState, SessionStore, PAGE_SIZE};
pub use spotify::{AccessToken, SpotifySearch, TokenCache};
pub use youtube_music::YoutubeMusicSearch;

use async_trait::async_trait;
use crate::api::Track;
use crate::downloader::ytdlp::VideoInfo;
use crate::api::TrackSource;
use crate::errors::Result;

/// One external catalog. Implementations may fail; the engine absorbs errors.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>>;
}

/// Track from a flat video-search entry.
pub(crate) fn track_from_entry(entry: &VideoInfo, source: TrackSource, with_artist: bool) -> Track {
    let track = Track::new(
        entry.id.clone(),
        entry.title.clone().unwrap_or_default(),
        entry.resolved_url(),
        source,
    )
    .with_duration(entry.duration_secs());

    match entry.attribution() {
        Some(artist) if with_artist => track.with_artist(artist),
        _ => track,
    }
}
