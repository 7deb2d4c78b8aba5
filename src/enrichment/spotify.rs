//! Spotify-backed enricher.
//!
//! # Responsibilities
//! - Read artist names from the uploaded CSV
//! - Exchange client credentials for an API access token
//! - Scrape the web player's anonymous token (needed for top tracks)
//! - Look up each artist, their top tracks and per-track audio features
//!
//! # Design Decisions
//! - Auth and transport failures abort the call; a non-success status on a
//!   per-artist or per-track lookup only degrades that entry
//! - Every URL is configurable so tests can point at a mock server

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::config::schema::EnrichmentConfig;
use crate::enrichment::types::{ArtistRecord, ArtistsResult, EnrichmentError, EnrichmentResult, TrackRecord};
use crate::enrichment::{ApiCredentials, Enricher};

const USER_AGENT: &str = concat!("artist-enricher/", env!("CARGO_PKG_VERSION"));
const CLIENT_TOKEN_MARKER: &str = "\"accessToken\":\"";
const ARTIST_OVERVIEW_HASH: &str = "da986392124383827dc03cbb3d66c1de81225244b6e20f8d78f9f802cc43df6e";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    artists: SearchArtists,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchArtists {
    items: Vec<SearchArtist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchArtist {
    id: Option<String>,
    followers: Followers,
    popularity: u32,
    genres: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Followers {
    total: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AudioFeatures {
    danceability: f64,
    energy: f64,
    acousticness: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackDetails {
    popularity: u32,
}

/// Artist fields taken from the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistInfo {
    pub artist_id: String,
    pub followers: u64,
    pub popularity: u32,
    pub genres: Vec<String>,
}

/// Top-track entry from the web player's artist overview.
#[derive(Debug, Clone, PartialEq)]
pub struct TopTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub play_count: Option<String>,
}

#[derive(Clone)]
pub struct SpotifyEnricher {
    client: Client,
    config: EnrichmentConfig,
}

impl SpotifyEnricher {
    pub fn new(config: EnrichmentConfig) -> EnrichmentResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Exchange client credentials for a bearer token.
    #[instrument(skip_all)]
    pub async fn access_token(&self, credentials: &ApiCredentials) -> EnrichmentResult<String> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id()),
                ("client_secret", credentials.client_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Failed to obtain access token");
            return Err(EnrichmentError::Auth(format!("token endpoint returned {status}")));
        }

        let token: TokenResponse = response.json().await.map_err(|e| EnrichmentError::MalformedResponse {
            endpoint: "token",
            detail: e.to_string(),
        })?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EnrichmentError::Auth("token response had no access_token".to_string()))
    }

    /// Fetch the web player page and pull out its anonymous access token.
    #[instrument(skip_all)]
    pub async fn client_token(&self) -> EnrichmentResult<String> {
        let response = self.client.get(&self.config.web_player_url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            error!(%status, "Failed to fetch client token page");
            return Err(EnrichmentError::Auth(format!("web player returned {status}")));
        }

        let html = response.text().await?;
        debug!(bytes = html.len(), "Got web player page");
        extract_client_token(&html)
            .ok_or_else(|| EnrichmentError::Auth("client token not found in page source".to_string()))
    }

    /// Look up the best match for `artist_name`. `None` when not found or on
    /// a non-success status.
    #[instrument(skip(self, access_token))]
    pub async fn search_artist(&self, artist_name: &str, access_token: &str) -> EnrichmentResult<Option<ArtistInfo>> {
        let response = self
            .client
            .get(format!("{}/search", self.config.api_base_url))
            .bearer_auth(access_token)
            .query(&[("q", artist_name), ("type", "artist"), ("limit", "1")])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            error!(status = %response.status(), "Failed to fetch data for artist");
            return Ok(None);
        }

        let body: SearchResponse = response.json().await.map_err(|e| EnrichmentError::MalformedResponse {
            endpoint: "search",
            detail: e.to_string(),
        })?;

        let info = body.artists.items.into_iter().next().and_then(|artist| {
            Some(ArtistInfo {
                artist_id: artist.id?,
                followers: artist.followers.total,
                popularity: artist.popularity,
                genres: artist.genres,
            })
        });
        if info.is_none() {
            warn!("Artist not found or missing necessary information");
        }
        Ok(info)
    }

    /// Top tracks for an artist via the web player's overview query.
    /// Empty on a non-success status.
    #[instrument(skip(self, client_token))]
    pub async fn top_tracks(&self, client_token: &str, artist_id: &str) -> EnrichmentResult<Vec<TopTrack>> {
        let variables = json!({
            "uri": format!("spotify:artist:{artist_id}"),
            "locale": "",
            "includePrerelease": true,
        })
        .to_string();
        let extensions = json!({
            "persistedQuery": { "version": 1, "sha256Hash": ARTIST_OVERVIEW_HASH },
        })
        .to_string();

        let response = self
            .client
            .get(&self.config.partner_api_url)
            .bearer_auth(client_token)
            .query(&[
                ("operationName", "queryArtistOverview"),
                ("variables", variables.as_str()),
                ("extensions", extensions.as_str()),
            ])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            error!(status = %response.status(), "Failed to fetch top tracks");
            return Ok(Vec::new());
        }

        let body: Value = response.json().await.map_err(|e| EnrichmentError::MalformedResponse {
            endpoint: "top_tracks",
            detail: e.to_string(),
        })?;
        Ok(parse_top_tracks(&body))
    }

    /// Track popularity, 0 when unavailable.
    pub async fn track_popularity(&self, access_token: &str, track_id: &str) -> EnrichmentResult<u32> {
        let details: Option<TrackDetails> = self
            .get_optional_json(&format!("{}/tracks/{}", self.config.api_base_url, track_id), access_token)
            .await?;
        Ok(details.map(|d| d.popularity).unwrap_or(0))
    }

    /// (danceability, energy, acousticness), zeros when unavailable.
    pub async fn audio_features(&self, access_token: &str, track_id: &str) -> EnrichmentResult<(f64, f64, f64)> {
        let features: Option<AudioFeatures> = self
            .get_optional_json(&format!("{}/audio-features/{}", self.config.api_base_url, track_id), access_token)
            .await?;
        let f = features.unwrap_or_default();
        Ok((f.danceability, f.energy, f.acousticness))
    }

    async fn get_optional_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> EnrichmentResult<Option<T>> {
        let response = self.client.get(url).bearer_auth(access_token).send().await?;
        if response.status() != StatusCode::OK {
            error!(url, status = %response.status(), "Lookup failed, using defaults");
            return Ok(None);
        }
        match response.json::<T>().await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(url, error = %e, "Unparseable lookup response, using defaults");
                Ok(None)
            }
        }
    }

    async fn enrich_track(&self, access_token: &str, track: TopTrack) -> EnrichmentResult<TrackRecord> {
        let (popularity, (danceability, energy, acousticness)) = match track.id.as_deref() {
            Some(id) => (
                self.track_popularity(access_token, id).await?,
                self.audio_features(access_token, id).await?,
            ),
            None => (0, (0.0, 0.0, 0.0)),
        };

        Ok(TrackRecord {
            track_name: track.name,
            popularity,
            play_count: track.play_count,
            danceability,
            energy,
            acousticness,
        })
    }
}

#[async_trait]
impl Enricher for SpotifyEnricher {
    #[instrument(skip(self, credentials), fields(path = %csv_path.display()))]
    async fn enrich(&self, csv_path: &Path, credentials: &ApiCredentials) -> EnrichmentResult<ArtistsResult> {
        let artist_names = read_artist_names(csv_path, &self.config.artist_column).await?;
        let access_token = self.access_token(credentials).await?;
        let client_token = self.client_token().await?;

        let mut artists = Vec::new();
        for artist_name in artist_names {
            info!(artist = %artist_name, "Processing artist");
            let Some(info) = self.search_artist(&artist_name, &access_token).await? else {
                continue;
            };

            let top_tracks = self.top_tracks(&client_token, &info.artist_id).await?;
            let mut tracks = Vec::new();
            for track in top_tracks.into_iter().take(self.config.top_tracks_limit) {
                tracks.push(self.enrich_track(&access_token, track).await?);
            }

            artists.push(ArtistRecord {
                name: artist_name,
                followers: info.followers,
                popularity: info.popularity,
                genres: info.genres,
                tracks,
            });
        }

        info!(artists = artists.len(), "Enrichment finished");
        Ok(artists)
    }
}

/// Read the artist column from a CSV file, skipping blank cells.
pub async fn read_artist_names(path: &Path, column: &str) -> EnrichmentResult<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    parse_artist_names(&bytes, column)
}

fn parse_artist_names(bytes: &[u8], column: &str) -> EnrichmentResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| EnrichmentError::MissingColumn(column.to_string()))?;

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(index).map(str::trim).filter(|n| !n.is_empty()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Find `"accessToken":"<token>"` in the web player HTML.
pub fn extract_client_token(html: &str) -> Option<String> {
    let start = html.find(CLIENT_TOKEN_MARKER)? + CLIENT_TOKEN_MARKER.len();
    let len = html[start..].find('"')?;
    let token = &html[start..start + len];
    (!token.is_empty()).then(|| token.to_string())
}

fn parse_top_tracks(body: &Value) -> Vec<TopTrack> {
    let Some(items) = body
        .pointer("/data/artistUnion/discography/topTracks/items")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            let track = item.get("track");
            let text = |key: &str| {
                track
                    .and_then(|t| t.get(key))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            TopTrack {
                id: text("id"),
                name: text("name"),
                play_count: text("playcount"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn config_for(server: &ServerGuard) -> EnrichmentConfig {
        let base = server.url();
        EnrichmentConfig {
            token_url: format!("{base}/api/token"),
            api_base_url: format!("{base}/v1"),
            partner_api_url: format!("{base}/pathfinder/v1/query"),
            web_player_url: format!("{base}/"),
            http_timeout_secs: 5,
            top_tracks_limit: 2,
            ..EnrichmentConfig::default()
        }
    }

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("bands.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_extract_client_token() {
        let html = r#"<script id="session">{"accessToken":"BQC-abc123","isAnonymous":true}</script>"#;
        assert_eq!(extract_client_token(html).as_deref(), Some("BQC-abc123"));
        assert_eq!(extract_client_token("<html></html>"), None);
        assert_eq!(extract_client_token(r#"{"accessToken":""}"#), None);
    }

    #[test]
    fn test_parse_artist_names() {
        let csv = "Date,Performer 1 Name,Venue\n2024-01-01,Boards of Canada,Hall\n2024-01-02,,Club\n2024-01-03, Autechre ,Bar\n";
        let names = parse_artist_names(csv.as_bytes(), "Performer 1 Name").unwrap();
        assert_eq!(names, vec!["Boards of Canada", "Autechre"]);
    }

    #[test]
    fn test_parse_artist_names_missing_column() {
        let err = parse_artist_names(b"name\nA\n", "Performer 1 Name").unwrap_err();
        assert!(matches!(err, EnrichmentError::MissingColumn(c) if c == "Performer 1 Name"));
    }

    #[test]
    fn test_parse_top_tracks_handles_missing_fields() {
        let body = json!({"data": {"artistUnion": {"discography": {"topTracks": {"items": [
            {"track": {"id": "t1", "name": "One", "playcount": "1234"}},
            {"track": {"name": "No id"}},
            {}
        ]}}}}});
        let tracks = parse_top_tracks(&body);
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].id.as_deref(), Some("t1"));
        assert_eq!(tracks[0].play_count.as_deref(), Some("1234"));
        assert_eq!(tracks[1].id, None);
        assert_eq!(tracks[2].name, None);
        assert!(parse_top_tracks(&json!({"errors": []})).is_empty());
    }

    #[tokio::test]
    async fn test_full_enrichment_against_mock_api() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/token")
            .match_body(Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()))
            .with_status(200)
            .with_body(r#"{"access_token":"api-token","token_type":"Bearer"}"#)
            .create_async()
            .await;
        let _page = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<html><script>{"accessToken":"web-token"}</script></html>"#)
            .create_async()
            .await;
        let _found = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::UrlEncoded("q".into(), "Boards of Canada".into()))
            .match_header("authorization", "Bearer api-token")
            .with_status(200)
            .with_body(r#"{"artists":{"items":[{"id":"boc","followers":{"total":900},"popularity":61,"genres":["idm"]}]}}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::UrlEncoded("q".into(), "Nobody".into()))
            .with_status(200)
            .with_body(r#"{"artists":{"items":[]}}"#)
            .create_async()
            .await;
        let _tracks = server
            .mock("GET", "/pathfinder/v1/query")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer web-token")
            .with_status(200)
            .with_body(
                json!({"data": {"artistUnion": {"discography": {"topTracks": {"items": [
                    {"track": {"id": "t1", "name": "Roygbiv", "playcount": "100"}},
                    {"track": {"id": "t2", "name": "Dayvan Cowboy", "playcount": "50"}},
                    {"track": {"id": "t3", "name": "Left out", "playcount": "1"}}
                ]}}}}})
                .to_string(),
            )
            .create_async()
            .await;
        let _pop1 = server
            .mock("GET", "/v1/tracks/t1")
            .with_status(200)
            .with_body(r#"{"popularity":55}"#)
            .create_async()
            .await;
        let _pop2 = server
            .mock("GET", "/v1/tracks/t2")
            .with_status(404)
            .create_async()
            .await;
        let _feat1 = server
            .mock("GET", "/v1/audio-features/t1")
            .with_status(200)
            .with_body(r#"{"danceability":0.5,"energy":0.25,"acousticness":0.75}"#)
            .create_async()
            .await;
        let _feat2 = server
            .mock("GET", "/v1/audio-features/t2")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "Performer 1 Name\nBoards of Canada\nNobody\n");
        let enricher = SpotifyEnricher::new(config_for(&server)).unwrap();

        let result = enricher
            .enrich(&path, &ApiCredentials::new("id", "secret"))
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let artist = &result[0];
        assert_eq!(artist.name, "Boards of Canada");
        assert_eq!(artist.followers, 900);
        assert_eq!(artist.genres, vec!["idm"]);
        assert_eq!(artist.tracks.len(), 2);
        assert_eq!(artist.tracks[0].popularity, 55);
        assert_eq!(artist.tracks[0].energy, 0.25);
        assert_eq!(artist.tracks[0].play_count.as_deref(), Some("100"));
        assert_eq!(artist.tracks[1].popularity, 0);
        assert_eq!(artist.tracks[1].danceability, 0.0);
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_with_auth_error() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "Performer 1 Name\nA\n");
        let enricher = SpotifyEnricher::new(config_for(&server)).unwrap();

        let err = enricher
            .enrich(&path, &ApiCredentials::new("bad", "creds"))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichmentError::Auth(_)));
    }

    #[tokio::test]
    async fn test_missing_client_token_fails_with_auth_error() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_body(r#"{"access_token":"api-token"}"#)
            .create_async()
            .await;
        let _page = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html>no token here</html>")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "Performer 1 Name\nA\n");
        let enricher = SpotifyEnricher::new(config_for(&server)).unwrap();

        let err = enricher
            .enrich(&path, &ApiCredentials::new("id", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichmentError::Auth(msg) if msg.contains("client token")));
    }
}
