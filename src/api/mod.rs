// Shared record shapes produced by the search sources and the downloaders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder title for results whose source gave none.
pub const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    Youtube,
    Spotify,
    Lyrics,
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Youtube => write!(f, "youtube"),
            Self::Spotify => write!(f, "spotify"),
            Self::Lyrics => write!(f, "lyrics"),
        }
    }
}

/// One search hit. `id` is unique within a single source's list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Seconds, 0 when unknown. Spotify results leave this at 0.
    pub duration: u64,
    pub url: String,
    pub source: TrackSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>, source: TrackSource) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            title: if title.trim().is_empty() { UNKNOWN_TITLE.to_string() } else { title },
            artist: String::new(),
            duration: 0,
            url: url.into(),
            source,
            album: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }
}

/// Three independent result lists. `lyrics` is only ever filled when the other
/// two came back empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MultiSearchResult {
    pub youtube: Vec<Track>,
    pub spotify: Vec<Track>,
    pub lyrics: Vec<Track>,
}

impl MultiSearchResult {
    pub fn is_empty(&self) -> bool {
        self.youtube.is_empty() && self.spotify.is_empty() && self.lyrics.is_empty()
    }

    pub fn total(&self) -> usize {
        self.youtube.len() + self.spotify.len() + self.lyrics.len()
    }
}

/// Probe result for a single media URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaInfo {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: Option<String>,
    pub duration: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<MediaFormat>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaFormat {
    pub format_id: String,
    pub ext: String,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
}

impl MediaFormat {
    pub fn is_video(&self) -> bool {
        self.vcodec.as_deref().map_or(false, |v| v != "none")
    }

    pub fn is_audio_only(&self) -> bool {
        self.acodec.as_deref().map_or(false, |a| a != "none") && !self.is_video()
    }
}

/// Resolution bucket of a quality option.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QualityHeight {
    Pixels(u32),
    /// Single-rendition platforms: whatever the backend delivers.
    Best,
    Audio,
}

impl fmt::Display for QualityHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pixels(h) => write!(f, "{}", h),
            Self::Best => write!(f, "best"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityOption {
    pub label: String,
    pub height: QualityHeight,
    /// Bytes, 0 when unknown.
    pub filesize: u64,
}

impl QualityOption {
    pub fn pixels(height: u32, filesize: u64) -> Self {
        Self {
            label: format!("{}p", height),
            height: QualityHeight::Pixels(height),
            filesize,
        }
    }

    pub fn video() -> Self {
        Self {
            label: "Video".to_string(),
            height: QualityHeight::Best,
            filesize: 0,
        }
    }

    pub fn audio(filesize: u64) -> Self {
        Self {
            label: "Audio".to_string(),
            height: QualityHeight::Audio,
            filesize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_falls_back_to_placeholder() {
        let track = Track::new("abc", "   ", "https://youtu.be/abc", TrackSource::Youtube);
        assert_eq!(track.title, UNKNOWN_TITLE);
        assert_eq!(track.artist, "");
        assert_eq!(track.duration, 0);
    }

    #[test]
    fn bundle_counts() {
        let mut bundle = MultiSearchResult::default();
        assert!(bundle.is_empty());
        bundle.spotify.push(Track::new("1", "Song", "https://open.spotify.com/track/1", TrackSource::Spotify));
        assert!(!bundle.is_empty());
        assert_eq!(bundle.total(), 1);
    }

    #[test]
    fn format_kinds() {
        let audio = MediaFormat {
            format_id: "140".into(),
            ext: "m4a".into(),
            height: None,
            vcodec: Some("none".into()),
            acodec: Some("mp4a.40.2".into()),
            filesize: Some(10),
        };
        assert!(audio.is_audio_only());
        assert!(!audio.is_video());
    }
}
