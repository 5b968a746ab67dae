use std::collections::HashSet;
use std::future::Future;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;
use crate::api::{Track, TrackSource};
use crate::config::SpotifyConfig;
use crate::downloader::http_pool::HttpPool;
use crate::errors::{AppError, Result};
use crate::search::SearchSource;
use crate::utils::unix_now;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// A token is refreshed once it is this close to expiry.
pub const EXPIRY_MARGIN_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// Unix seconds.
    pub expires_at: u64,
}

impl AccessToken {
    pub fn is_fresh(&self, now: u64) -> bool {
        self.expires_at.saturating_sub(EXPIRY_MARGIN_SECS) > now
    }
}

/// Bearer token with its expiry, swapped as one value under a lock so
/// readers never see a token paired with the wrong expiry.
#[derive(Default)]
pub struct TokenCache {
    token: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token when still fresh at `now`, otherwise `fetch` is awaited
    /// for `(token, expires_in_secs)` and the result stored. Concurrent
    /// callers wait for the one refresh in progress.
    pub async fn get_or_refresh<F, Fut>(&self, now: u64, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, u64)>>,
    {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let (value, expires_in) = fetch().await?;
        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at: now + expires_in,
        });
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    pub async fn current(&self) -> Option<AccessToken> {
        self.token.lock().await.clone()
    }
}

/// Spotify catalog search over client credentials. Inert without credentials.
pub struct SpotifySearch {
    http: HttpPool,
    credentials: Option<(String, String)>,
    market: String,
    tokens: TokenCache,
}

impl SpotifySearch {
    pub fn new(http: HttpPool, config: &SpotifyConfig) -> Self {
        let credentials = config
            .credentials()
            .map(|(id, secret)| (id.to_string(), secret.to_string()));
        if credentials.is_none() {
            log::info!("🎧 [SPOTIFY] No client credentials configured, Spotify search disabled");
        }

        Self {
            http,
            credentials,
            market: config.market.clone(),
            tokens: TokenCache::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn request_token(&self, client_id: &str, client_secret: &str) -> Result<(String, u64)> {
        let basic = STANDARD.encode(format!("{}:{}", client_id, client_secret));
        let response = self
            .http
            .client()
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", basic))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Api(format!("Spotify token request failed: {}", response.status())));
        }

        let json: Value = response.json().await?;
        let token = json["access_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Api("Spotify token response has no access_token".to_string()))?;
        let expires_in = json["expires_in"].as_u64().unwrap_or(0);

        log::debug!("🔑 [SPOTIFY] New access token, expires in {}s", expires_in);
        Ok((token.to_string(), expires_in))
    }

    async fn try_search(&self, client_id: &str, client_secret: &str, query: &str, limit: usize) -> Result<Vec<Track>> {
        let token = self
            .tokens
            .get_or_refresh(unix_now(), || self.request_token(client_id, client_secret))
            .await?;

        let url = format!(
            "{}?q={}&type=track&limit={}&market={}",
            SEARCH_URL,
            urlencoding::encode(query),
            limit,
            urlencoding::encode(&self.market)
        );
        let response = self
            .http
            .client()
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        self.check_search_status(response.status()).await?;

        let json: Value = response.json().await?;
        Ok(parse_tracks(&json, limit))
    }

    /// A rejected token is dropped so the next search fetches a new one.
    async fn check_search_status(&self, status: StatusCode) -> Result<()> {
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            return Err(AppError::Search(format!("Spotify search failed: {}", status)));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchSource for SpotifySearch {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        let query = query.trim();
        let Some((client_id, client_secret)) = &self.credentials else {
            return Ok(Vec::new());
        };
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        match self.try_search(client_id, client_secret, query, limit).await {
            Ok(tracks) => {
                log::info!("🎧 [SPOTIFY] '{}' -> {} tracks", query, tracks.len());
                Ok(tracks)
            }
            Err(e) => {
                log::warn!("⚠️ [SPOTIFY] Search failed for '{}': {}", query, e);
                Ok(Vec::new())
            }
        }
    }
}

/// Tracks from a `v1/search?type=track` response body.
pub fn parse_tracks(json: &Value, limit: usize) -> Vec<Track> {
    let Some(items) = json["tracks"]["items"].as_array() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| {
            let url = item["external_urls"]["spotify"].as_str().unwrap_or("");
            let id = item["id"].as_str().filter(|id| !id.is_empty()).unwrap_or(url);
            // Items with neither id nor link cannot be told apart.
            if id.is_empty() || !seen.insert(id.to_string()) {
                return None;
            }
            let track = Track::new(id, item["name"].as_str().unwrap_or(""), url, TrackSource::Spotify)
                .with_artist(item["artists"][0]["name"].as_str().unwrap_or(""));
            Some(match item["album"]["name"].as_str().filter(|a| !a.is_empty()) {
                Some(album) => track.with_album(album),
                None => track,
            })
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn parses_search_response() {
        let body = json!({
            "tracks": {
                "items": [
                    {
                        "id": "7qiZfU4dY1lWllzX7mPBI3",
                        "name": "Shape of You",
                        "artists": [{"name": "Ed Sheeran"}, {"name": "Other"}],
                        "album": {"name": "÷ (Deluxe)"},
                        "external_urls": {"spotify": "https://open.spotify.com/track/7qiZfU4dY1lWllzX7mPBI3"}
                    },
                    {
                        "name": "",
                        "artists": [],
                        "album": {},
                        "external_urls": {"spotify": "https://open.spotify.com/track/local1"}
                    }
                ]
            }
        });

        let tracks = parse_tracks(&body, 5);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist, "Ed Sheeran");
        assert_eq!(tracks[0].album.as_deref(), Some("÷ (Deluxe)"));
        assert_eq!(tracks[0].duration, 0);
        assert_eq!(tracks[1].title, crate::api::UNKNOWN_TITLE);
        assert_eq!(tracks[1].id, "https://open.spotify.com/track/local1");
        assert!(parse_tracks(&json!({"error": "bad"}), 5).is_empty());
    }

    #[test]
    fn unidentifiable_and_repeated_items_are_dropped() {
        let body = json!({
            "tracks": {
                "items": [
                    {"id": "a", "name": "A", "external_urls": {"spotify": "https://open.spotify.com/track/a"}},
                    {"name": "no id", "external_urls": {}},
                    {"name": "no id either", "id": ""},
                    {"id": "a", "name": "A again", "external_urls": {"spotify": "https://open.spotify.com/track/a"}},
                    {"id": "b", "name": "B", "external_urls": {"spotify": "https://open.spotify.com/track/b"}}
                ]
            }
        });

        let ids: Vec<String> = parse_tracks(&body, 5).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(parse_tracks(&body, 1).len(), 1);
    }

    #[tokio::test]
    async fn token_is_reused_until_margin() {
        let cache = TokenCache::new();
        let fetches = AtomicUsize::new(0);
        let fetch = || {
            let n = fetches.fetch_add(1, Ordering::SeqCst);
            async move { Ok((format!("token-{}", n), 3600)) }
        };

        assert_eq!(cache.get_or_refresh(1_000, fetch).await.unwrap(), "token-0");
        assert_eq!(cache.get_or_refresh(1_000 + 3_569, fetch).await.unwrap(), "token-0");
        // 3570s in, the 30s margin has been reached.
        assert_eq!(cache.get_or_refresh(1_000 + 3_570, fetch).await.unwrap(), "token-1");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.current().await.map(|t| t.expires_at), Some(4_570 + 3_600));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_nothing() {
        let cache = TokenCache::new();
        let result = cache
            .get_or_refresh(10, || async { Err(AppError::Api("down".to_string())) })
            .await;
        assert!(result.is_err());
        assert!(cache.current().await.is_none());
    }

    fn configured() -> SpotifyConfig {
        SpotifyConfig {
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..SpotifyConfig::default()
        }
    }

    #[tokio::test]
    async fn unreachable_api_degrades_to_empty_results() {
        let http = HttpPool::new(1).unwrap().with_proxy("socks5://127.0.0.1:1").unwrap();
        let search = SpotifySearch::new(http, &configured());
        assert!(search.is_configured());

        let tracks = search.search("shape of you", 5).await.unwrap();
        assert!(tracks.is_empty());
        assert!(search.tokens.current().await.is_none());
    }

    #[tokio::test]
    async fn unauthorized_search_drops_cached_token() {
        let search = SpotifySearch::new(HttpPool::new(1).unwrap(), &configured());
        search
            .tokens
            .get_or_refresh(unix_now(), || async { Ok(("stale".to_string(), 3600)) })
            .await
            .unwrap();

        assert!(search.check_search_status(StatusCode::OK).await.is_ok());
        assert!(search.tokens.current().await.is_some());

        let result = search.check_search_status(StatusCode::UNAUTHORIZED).await;
        assert!(matches!(result, Err(AppError::Search(_))));
        assert!(search.tokens.current().await.is_none());
    }

    #[tokio::test]
    async fn missing_credentials_yield_empty_results() {
        let search = SpotifySearch::new(HttpPool::new(5).unwrap(), &SpotifyConfig::default());
        assert!(!search.is_configured());
        assert!(search.search("shape of you", 5).await.unwrap().is_empty());
    }
}
