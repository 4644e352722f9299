//! Spotify-backed track generator
//!
//! Spotify's catalog picks the tracks for a genre; the audio itself comes
//! from the Saavn search API, which exposes direct download links.

use crate::generator::TrackGenerator;
use crate::http::HttpClient;
use babble_common::audio::load_bytes;
use babble_common::config::ConfigResolver;
use babble_common::{AudioData, Error, Genre, Result, SampleGenerator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_SEARCH_URL: &str = "https://api.spotify.com/v1/search";
const SAAVN_SEARCH_URL: &str = "https://saavn.dev/api/search/songs";

/// Remote endpoints used by [`SpotifyGenerator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: String,
    pub search_url: String,
    pub download_search_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            search_url: SPOTIFY_SEARCH_URL.to_string(),
            download_search_url: SAAVN_SEARCH_URL.to_string(),
        }
    }
}

/// Client-credentials token response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Spotify search response (only the fields used)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<TrackPage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackItem {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
}

/// Saavn song search response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SaavnResponse {
    #[serde(default)]
    pub data: SaavnData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SaavnData {
    #[serde(default)]
    pub results: Vec<SaavnSong>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SaavnSong {
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Vec<DownloadLink>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadLink {
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub url: String,
}

/// `"<first artist> <track name>"` for every item of type `track`
pub fn track_queries(response: &SearchResponse) -> Vec<String> {
    response
        .tracks
        .iter()
        .flat_map(|page| page.items.iter())
        .filter(|item| item.kind == "track")
        .map(|item| {
            let artist = item.artists.first().map(|a| a.name.as_str()).unwrap_or("");
            format!("{} {}", artist, item.name)
        })
        .collect()
}

/// Last (highest quality) download link of the first result
pub fn best_download_url(response: &SaavnResponse) -> Option<&str> {
    response
        .data
        .results
        .first()?
        .download_url
        .last()
        .map(|link| link.url.as_str())
        .filter(|url| !url.is_empty())
}

/// Lower-cased file extension of a URL path, used as a decoder hint
fn url_extension(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?.to_string();
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// Genre samples found on Spotify and downloaded from Saavn
pub struct SpotifyGenerator {
    limit: usize,
    genre: Genre,
    http: HttpClient,
    config: ConfigResolver,
    endpoints: Endpoints,
    access_token: Option<String>,
}

impl SpotifyGenerator {
    pub fn new(limit: usize, genre: Genre, config: ConfigResolver) -> Result<Self> {
        Ok(Self::with_endpoints(
            limit,
            genre,
            config,
            HttpClient::new()?,
            Endpoints::default(),
        ))
    }

    pub fn with_endpoints(
        limit: usize,
        genre: Genre,
        config: ConfigResolver,
        http: HttpClient,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            limit,
            genre,
            http,
            config,
            endpoints,
            access_token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Obtain a client-credentials token using `SPOTIFY_CLIENT_ID` and
    /// `SPOTIFY_CLIENT_SECRET`.
    pub async fn authenticate(&mut self) -> Result<()> {
        let client_id = self.config.get(CLIENT_ID_VAR)?;
        let client_secret = self.config.get(CLIENT_SECRET_VAR)?;

        let request = self
            .http
            .client()
            .post(&self.endpoints.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")]);
        let token: TokenResponse = self.http.json(request).await?;

        info!(expires_in = token.expires_in, "Authenticated with Spotify");
        self.access_token = Some(token.access_token);
        Ok(())
    }

    fn token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| Error::Config("Spotify client is not authenticated".to_string()))
    }
}

impl TrackGenerator for SpotifyGenerator {
    fn generator(&self) -> SampleGenerator {
        SampleGenerator::Spotify
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn genre(&self) -> &Genre {
        &self.genre
    }

    async fn search_audio_files(&self) -> Result<Vec<String>> {
        let token = self.token()?;
        let query = format!("genre:{}", self.genre);
        let limit = self.limit.to_string();

        let request = self
            .http
            .client()
            .get(&self.endpoints.search_url)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", limit.as_str())]);
        let response: SearchResponse = self.http.json(request).await?;

        let queries = track_queries(&response);
        debug!("Spotify returned {} tracks for {}", queries.len(), query);
        Ok(queries)
    }

    async fn download_audio_file(&self, query: &str) -> Result<AudioData> {
        let request = self
            .http
            .client()
            .get(&self.endpoints.download_search_url)
            .query(&[("query", query)]);
        let response: SaavnResponse = self.http.json(request).await?;

        let url = best_download_url(&response)
            .ok_or_else(|| Error::InvalidInput(format!("No download link for \"{}\"", query)))?
            .to_string();

        let bytes = self.http.bytes(self.http.client().get(&url)).await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        let extension = url_extension(&url);
        load_bytes(bytes, extension.as_deref(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_queries_keep_tracks_only() {
        let json = r#"{
            "tracks": {
                "items": [
                    {"name": "Song A", "type": "track", "artists": [{"name": "Artist 1"}, {"name": "Guest"}]},
                    {"name": "Episode", "type": "episode", "artists": [{"name": "Host"}]},
                    {"name": "Song B", "type": "track", "artists": []}
                ]
            }
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(track_queries(&response), vec!["Artist 1 Song A", " Song B"]);
    }

    #[test]
    fn test_track_queries_without_tracks() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(track_queries(&response).is_empty());
    }

    #[test]
    fn test_best_download_url_takes_last_link() {
        let json = r#"{
            "data": {
                "results": [
                    {"downloadUrl": [
                        {"quality": "12kbps", "url": "https://cdn.example/a_12.mp4"},
                        {"quality": "320kbps", "url": "https://cdn.example/a_320.mp4"}
                    ]},
                    {"downloadUrl": [{"quality": "320kbps", "url": "https://cdn.example/b.mp4"}]}
                ]
            }
        }"#;
        let response: SaavnResponse = serde_json::from_str(json).unwrap();
        assert_eq!(best_download_url(&response), Some("https://cdn.example/a_320.mp4"));
    }

    #[test]
    fn test_best_download_url_empty_results() {
        let response: SaavnResponse = serde_json::from_str(r#"{"data": {"results": []}}"#).unwrap();
        assert_eq!(best_download_url(&response), None);
        let response: SaavnResponse =
            serde_json::from_str(r#"{"data": {"results": [{"downloadUrl": []}]}}"#).unwrap();
        assert_eq!(best_download_url(&response), None);
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://cdn.example/x/a_320.MP4?t=1").as_deref(), Some("mp4"));
        assert_eq!(url_extension("https://cdn.example/stream"), None);
        assert_eq!(url_extension("not a url"), None);
    }

    #[tokio::test]
    async fn test_search_requires_authentication() {
        let generator = SpotifyGenerator::new(5, Genre::default(), ConfigResolver::default()).unwrap();
        assert!(!generator.is_authenticated());
        assert!(matches!(generator.search_audio_files().await, Err(Error::Config(_))));
    }
}
