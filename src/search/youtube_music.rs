use std::collections::HashSet;
use std::sync::Arc;
use async_trait::async_trait;
use crate::api::{Track, TrackSource};
use crate::downloader::ytdlp::MediaExtractor;
use crate::errors::Result;
use crate::search::{track_from_entry, SearchSource};

/// Bias terms tried in order. The empty suffix is the bare query.
pub const QUERY_SUFFIXES: [&str; 5] = [" audio", " official audio", "", " music", " song"];

/// Music-biased video search: several query variants, deduplicated by video id.
pub struct YoutubeMusicSearch {
    extractor: Arc<dyn MediaExtractor>,
}

impl YoutubeMusicSearch {
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { extractor }
    }

    pub fn query_variants(query: &str) -> Vec<String> {
        QUERY_SUFFIXES
            .iter()
            .map(|suffix| format!("{}{}", query, suffix))
            .collect()
    }
}

#[async_trait]
impl SearchSource for YoutubeMusicSearch {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();

        for variant in Self::query_variants(query) {
            if tracks.len() >= limit {
                break;
            }

            let entries = match self.extractor.search(&variant, limit).await {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("⚠️ [YOUTUBE] Variant '{}' failed: {}", variant, e);
                    continue;
                }
            };

            for entry in entries {
                if entry.id.is_empty() || !seen.insert(entry.id.clone()) {
                    continue;
                }
                tracks.push(track_from_entry(&entry, TrackSource::Youtube, true));
                if tracks.len() >= limit {
                    break;
                }
            }
        }

        log::info!("🎵 [YOUTUBE] '{}' -> {} tracks", query, tracks.len());
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entry, MockExtractor};

    #[tokio::test]
    async fn stops_once_limit_is_reached() {
        let extractor = Arc::new(
            MockExtractor::new()
                .with_search("q audio", vec![entry("a", "A"), entry("b", "B")])
                .with_search("q official audio", vec![entry("c", "C"), entry("d", "D")])
                .with_search("q", vec![entry("e", "E")]),
        );
        let source = YoutubeMusicSearch::new(extractor.clone());

        let tracks = source.search("q", 3).await.unwrap();
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(extractor.searched_queries(), vec!["q audio", "q official audio"]);
    }

    #[tokio::test]
    async fn failed_variant_does_not_abort_the_rest() {
        let extractor = Arc::new(
            MockExtractor::new()
                .failing_search("q audio")
                .with_search("q song", vec![entry("z", "Z")]),
        );
        let source = YoutubeMusicSearch::new(extractor.clone());

        let tracks = source.search("q", 10).await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist, "Channel");
        assert_eq!(tracks[0].duration, 180);
        assert_eq!(extractor.search_calls(), 5);
    }

    #[test]
    fn variants_follow_bias_order() {
        assert_eq!(
            YoutubeMusicSearch::query_variants("x"),
            vec!["x audio", "x official audio", "x", "x music", "x song"]
        );
    }
}
