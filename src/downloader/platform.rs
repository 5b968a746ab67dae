use std::fmt;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Platforms the downloaders recognise. `Other` is free text or an
/// unsupported site and must be treated as a search query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    TikTok,
    Snapchat,
    Likee,
    Other,
}

/// Detection priority. Earlier entries win when a string looks like several platforms.
pub const PLATFORM_ORDER: [Platform; 5] = [
    Platform::Youtube,
    Platform::Instagram,
    Platform::TikTok,
    Platform::Snapchat,
    Platform::Likee,
];

lazy_static! {
    static ref YOUTUBE_RE: Regex = Regex::new(
        r"(?i)(https?://)?(www\.|m\.|music\.)?(youtube\.com/(watch\?v=|shorts/)|youtu\.be/)[\w\-]+"
    ).expect("valid youtube pattern");
    static ref INSTAGRAM_RE: Regex = Regex::new(
        r"(?i)(https?://)?(www\.)?(instagram\.com/([\w.\-]+/)?(p|reel|reels|tv|stories)/|instagr\.am/(p|reel)/)[\w\-./]+"
    ).expect("valid instagram pattern");
    static ref TIKTOK_RE: Regex = Regex::new(
        r"(?i)(https?://)?(www\.|vm\.|vt\.|m\.)?tiktok\.com/[\w\-@/.]+"
    ).expect("valid tiktok pattern");
    static ref SNAPCHAT_RE: Regex = Regex::new(
        r"(?i)(https?://)?(www\.|story\.|t\.)?snapchat\.com/[\w\-@/.?=&]+"
    ).expect("valid snapchat pattern");
    static ref LIKEE_RE: Regex = Regex::new(
        r"(?i)(https?://)?(www\.|l\.|m\.)?(likee\.video|like\.video)/[\w\-@/.]+"
    ).expect("valid likee pattern");
}

impl Platform {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
            Self::Snapchat => "snapchat",
            Self::Likee => "likee",
            Self::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Youtube => "YouTube",
            Self::Instagram => "Instagram",
            Self::TikTok => "TikTok",
            Self::Snapchat => "Snapchat",
            Self::Likee => "Likee",
            Self::Other => "Other",
        }
    }

    fn pattern(&self) -> Option<&'static Regex> {
        let pattern: &'static Regex = match self {
            Self::Youtube => &YOUTUBE_RE,
            Self::Instagram => &INSTAGRAM_RE,
            Self::TikTok => &TIKTOK_RE,
            Self::Snapchat => &SNAPCHAT_RE,
            Self::Likee => &LIKEE_RE,
            Self::Other => return None,
        };
        Some(pattern)
    }

    /// Pure pattern match anywhere in `text`; `Other` never matches anything.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern().map_or(false, |pattern| pattern.is_match(text))
    }

    /// The first link of this platform inside `text`, e.g. from a share message.
    pub fn find_link<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern()?.find(text).map(|m| m.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// First platform in [`PLATFORM_ORDER`] whose pattern matches, else `Other`.
pub fn detect_platform(text: &str) -> Platform {
    PLATFORM_ORDER
        .iter()
        .copied()
        .find(|platform| platform.matches(text))
        .unwrap_or(Platform::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_known_url_shapes() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Platform::Youtube),
            ("youtu.be/dQw4w9WgXcQ", Platform::Youtube),
            ("HTTPS://YOUTUBE.COM/SHORTS/abc_123", Platform::Youtube),
            ("https://www.instagram.com/reel/Cx1y2z3/", Platform::Instagram),
            ("https://instagram.com/p/ABC-123/?igsh=1", Platform::Instagram),
            ("https://vm.tiktok.com/ABC123/", Platform::TikTok),
            ("https://www.tiktok.com/@user/video/7234", Platform::TikTok),
            ("https://story.snapchat.com/s/abc", Platform::Snapchat),
            ("https://www.snapchat.com/spotlight/W7_EDlXW", Platform::Snapchat),
            ("https://l.likee.video/v/abc", Platform::Likee),
            ("like.video/@user/video/1", Platform::Likee),
        ];
        for (url, expected) in cases {
            assert_eq!(detect_platform(url), expected, "{}", url);
        }
    }

    #[test]
    fn free_text_and_garbage_are_other() {
        for text in ["", "   ", "shape of you", "https://example.com/watch?v=1", "\u{0}\u{fffd}\u{7f}", "youtube.com/"] {
            assert_eq!(detect_platform(text), Platform::Other, "{:?}", text);
        }
    }

    #[test]
    fn earlier_platform_wins_for_mixed_strings() {
        let text = "https://vm.tiktok.com/ABC/ and https://youtu.be/xyz";
        assert_eq!(detect_platform(text), Platform::Youtube);
        assert_eq!(detect_platform(text), detect_platform(text));
    }

    #[test]
    fn link_is_cut_out_of_share_text() {
        let text = "check this https://youtu.be/dQw4w9WgXcQ it's great";
        assert_eq!(Platform::Youtube.find_link(text), Some("https://youtu.be/dQw4w9WgXcQ"));
        assert_eq!(Platform::TikTok.find_link("see vm.tiktok.com/ABC123/ now"), Some("vm.tiktok.com/ABC123/"));
        assert_eq!(Platform::Youtube.find_link("shape of you"), None);
        assert_eq!(Platform::Other.find_link(text), None);
    }

    #[test]
    fn ids_are_lowercase() {
        assert_eq!(Platform::TikTok.to_string(), "tiktok");
        assert_eq!(Platform::Other.id(), "other");
    }
}
