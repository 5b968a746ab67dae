use std::sync::Arc;
use std::time::Duration;
use crate::api::{MultiSearchResult, Track};
use crate::config::SearchConfig;
use crate::search::SearchSource;

/// Tiered aggregation over the three catalogs.
///
/// YouTube and Spotify are queried concurrently; each is bounded by its own
/// timeout and a failure counts as an empty list. Lyrics runs only after
/// both came back empty. Lists are returned as each source produced them.
pub struct SearchEngine {
    youtube: Arc<dyn SearchSource>,
    spotify: Arc<dyn SearchSource>,
    lyrics: Arc<dyn SearchSource>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        youtube: Arc<dyn SearchSource>,
        spotify: Arc<dyn SearchSource>,
        lyrics: Arc<dyn SearchSource>,
        config: SearchConfig,
    ) -> Self {
        Self { youtube, spotify, lyrics, config }
    }

    pub async fn multi_search(&self, query: &str) -> MultiSearchResult {
        let query = query.trim();
        if query.is_empty() {
            log::debug!("🔍 [SEARCH] Empty query, no sources contacted");
            return MultiSearchResult::default();
        }

        log::info!("🔍 [SEARCH] Searching for '{}'", query);
        let (youtube, spotify) = tokio::join!(
            self.query_source(&self.youtube, query, self.config.youtube_limit),
            self.query_source(&self.spotify, query, self.config.spotify_limit),
        );

        let lyrics = if youtube.is_empty() && spotify.is_empty() {
            log::info!("🔁 [SEARCH] No primary results for '{}', trying lyrics", query);
            self.query_source(&self.lyrics, query, self.config.lyrics_limit).await
        } else {
            Vec::new()
        };

        let result = MultiSearchResult { youtube, spotify, lyrics };
        log::info!(
            "📊 [SEARCH] '{}': youtube={} spotify={} lyrics={}",
            query,
            result.youtube.len(),
            result.spotify.len(),
            result.lyrics.len()
        );
        result
    }

    async fn query_source(&self, source: &Arc<dyn SearchSource>, query: &str, limit: usize) -> Vec<Track> {
        let timeout = Duration::from_secs(self.config.source_timeout_secs);
        match tokio::time::timeout(timeout, source.search(query, limit)).await {
            Ok(Ok(tracks)) => tracks,
            Ok(Err(e)) => {
                log::warn!("⚠️ [SEARCH] {} failed: {}", source.name(), e);
                Vec::new()
            }
            Err(_) => {
                log::warn!("⏱️ [SEARCH] {} timed out after {:?}", source.name(), timeout);
                Vec::new()
            }
        }
    }
}
