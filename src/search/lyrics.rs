use std::collections::HashSet;
use std::sync::Arc;
use async_trait::async_trait;
use crate::api::{Track, TrackSource};
use crate::downloader::ytdlp::MediaExtractor;
use crate::errors::Result;
use crate::search::{track_from_entry, SearchSource};

/// Last-resort search: one lyrics-biased query on the video backend.
pub struct LyricsSearch {
    extractor: Arc<dyn MediaExtractor>,
}

impl LyricsSearch {
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl SearchSource for LyricsSearch {
    fn name(&self) -> &str {
        "lyrics"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.extractor.search(&format!("{} lyrics", query), limit).await?;
        let mut seen = HashSet::new();
        let tracks: Vec<Track> = entries
            .iter()
            .filter(|entry| !entry.id.is_empty() && seen.insert(entry.id.clone()))
            .take(limit)
            .map(|entry| track_from_entry(entry, TrackSource::Lyrics, false))
            .collect();

        log::info!("📝 [LYRICS] '{}' -> {} tracks", query, tracks.len());
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entry, MockExtractor};

    #[tokio::test]
    async fn issues_single_biased_query() {
        let extractor = Arc::new(MockExtractor::new().with_search("song lyrics", vec![entry("l1", "Song (Lyrics)")]));
        let source = LyricsSearch::new(extractor.clone());

        let tracks = source.search(" song ", 10).await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].source, TrackSource::Lyrics);
        assert_eq!(tracks[0].url, "https://www.youtube.com/watch?v=l1");
        assert_eq!(extractor.searched_queries(), vec!["song lyrics"]);
    }

    #[tokio::test]
    async fn repeated_entries_are_listed_once() {
        let extractor = Arc::new(MockExtractor::new().with_search(
            "q lyrics",
            vec![entry("a", "A"), entry("a", "A again"), entry("b", "B")],
        ));
        let tracks = LyricsSearch::new(extractor).search("q", 10).await.unwrap();
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
