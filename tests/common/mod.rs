//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use artist_enricher::config::{ApiCredentials, AppConfig};
use artist_enricher::enrichment::{ArtistRecord, ArtistsResult, EnrichmentError, EnrichmentResult, Enricher};
use artist_enricher::security::rate_limit::RateLimiter;
use artist_enricher::{HttpServer, Shutdown};
use async_trait::async_trait;
use tokio::net::TcpListener;

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";

/// A running server plus the scratch directory its uploads land in.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub rate_limiter: Arc<RateLimiter>,
    upload_dir: PathBuf,
    _temp: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Files currently sitting in the upload directory.
    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Remove the upload directory out from under the running server.
    pub fn remove_upload_dir(&self) {
        std::fs::remove_dir_all(&self.upload_dir).unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the server on an ephemeral port with the given enricher.
pub async fn start_server(mut config: AppConfig, enricher: Arc<dyn Enricher>) -> TestServer {
    let temp = tempfile::tempdir().unwrap();
    let upload_dir = temp.path().join("uploads");
    config.upload.temp_dir = upload_dir.to_string_lossy().into_owned();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, ApiCredentials::new(CLIENT_ID, CLIENT_SECRET), enricher).unwrap();
    let rate_limiter = server.rate_limiter();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer {
        addr,
        shutdown,
        rate_limiter,
        upload_dir,
        _temp: temp,
    }
}

/// Client that does not follow redirects, so 303s can be inspected.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub fn csv_form(file_name: &str, body: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(body.as_bytes().to_vec()).file_name(file_name.to_string());
    reqwest::multipart::Form::new().part("file", part)
}

/// The `name=value` pair from a response's Set-Cookie header.
pub fn cookie_pair(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .to_string()
}

/// Follow a flash redirect by hand and return the rendered form.
pub async fn follow_flash(client: &reqwest::Client, server: &TestServer, response: reqwest::Response) -> String {
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()[reqwest::header::LOCATION], "/");
    let cookie = cookie_pair(&response);
    assert!(cookie.starts_with("flash="), "expected flash cookie, got '{cookie}'");

    client
        .get(server.url())
        .header(reqwest::header::COOKIE, cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

/// Records every call and answers with one artist per CSV line.
#[derive(Default)]
pub struct RecordingEnricher {
    pub calls: Mutex<Vec<(PathBuf, bool)>>,
}

#[async_trait]
impl Enricher for RecordingEnricher {
    async fn enrich(&self, csv_path: &Path, credentials: &ApiCredentials) -> EnrichmentResult<ArtistsResult> {
        assert_eq!(credentials.client_id(), CLIENT_ID);
        assert_eq!(credentials.client_secret(), CLIENT_SECRET);

        let existed = csv_path.exists();
        self.calls.lock().unwrap().push((csv_path.to_path_buf(), existed));

        let body = tokio::fs::read_to_string(csv_path).await?;
        Ok(body.lines().skip(1).map(artist).collect())
    }
}

/// Always fails, as an unreachable or misbehaving API would.
pub struct FailingEnricher {
    pub seen_path: Mutex<Option<PathBuf>>,
}

impl FailingEnricher {
    pub fn new() -> Self {
        Self { seen_path: Mutex::new(None) }
    }
}

#[async_trait]
impl Enricher for FailingEnricher {
    async fn enrich(&self, csv_path: &Path, _credentials: &ApiCredentials) -> EnrichmentResult<ArtistsResult> {
        *self.seen_path.lock().unwrap() = Some(csv_path.to_path_buf());
        Err(EnrichmentError::MalformedResponse {
            endpoint: "search",
            detail: "internal-detail-42".to_string(),
        })
    }
}

/// Holds every call at a barrier so concurrent uploads overlap in time.
pub struct GatedEnricher {
    barrier: tokio::sync::Barrier,
}

impl GatedEnricher {
    pub fn new(parties: usize) -> Self {
        Self { barrier: tokio::sync::Barrier::new(parties) }
    }
}

#[async_trait]
impl Enricher for GatedEnricher {
    async fn enrich(&self, csv_path: &Path, _credentials: &ApiCredentials) -> EnrichmentResult<ArtistsResult> {
        let before = tokio::fs::read_to_string(csv_path).await?;
        self.barrier.wait().await;
        // The other request has stored its file by now; ours must be intact.
        let after = tokio::fs::read_to_string(csv_path).await?;
        assert_eq!(before, after);
        Ok(after.lines().skip(1).map(artist).collect())
    }
}

pub fn artist(name: &str) -> ArtistRecord {
    ArtistRecord {
        name: name.to_string(),
        followers: 1,
        popularity: 1,
        genres: Vec::new(),
        tracks: Vec::new(),
    }
}
