//! Artist enrichment subsystem.
//!
//! # Data Flow
//! ```text
//! stored CSV path + ApiCredentials
//!     → Enricher::enrich (spotify.rs in production, stubs in tests)
//!     → ArtistsResult
//!     → rendered by the HTTP layer, or export.rs for the CLI
//! ```
//!
//! # Design Decisions
//! - The HTTP layer depends on the `Enricher` trait only
//! - Every failure is an `EnrichmentError`; nothing panics across the boundary
//! - The caller bounds the whole call with a timeout

pub mod export;
pub mod spotify;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

pub use crate::config::credentials::ApiCredentials;
pub use spotify::SpotifyEnricher;
pub use types::{ArtistRecord, ArtistsResult, EnrichmentError, EnrichmentResult, TrackRecord};

/// Turns an uploaded CSV of artist names into structured artist data.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, csv_path: &Path, credentials: &ApiCredentials) -> EnrichmentResult<ArtistsResult>;
}

/// Run an enrichment call under a deadline.
pub async fn enrich_with_timeout(
    enricher: &dyn Enricher,
    csv_path: &Path,
    credentials: &ApiCredentials,
    timeout: std::time::Duration,
) -> EnrichmentResult<ArtistsResult> {
    let started = std::time::Instant::now();
    let result = match tokio::time::timeout(timeout, enricher.enrich(csv_path, credentials)).await {
        Ok(result) => result,
        Err(_) => Err(EnrichmentError::Timeout(timeout.as_secs())),
    };
    crate::observability::metrics::record_enrichment(started, result.is_ok());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Slow;

    #[async_trait]
    impl Enricher for Slow {
        async fn enrich(&self, _: &Path, _: &ApiCredentials) -> EnrichmentResult<ArtistsResult> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_error() {
        let creds = ApiCredentials::new("id", "secret");
        let result = enrich_with_timeout(&Slow, Path::new("x.csv"), &creds, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(EnrichmentError::Timeout(0))));
    }
}
