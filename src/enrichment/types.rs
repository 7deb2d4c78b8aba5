//! Enrichment result types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enriched data for one artist row of the uploaded CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub name: String,
    pub followers: u64,
    pub popularity: u32,
    pub genres: Vec<String>,
    pub tracks: Vec<TrackRecord>,
}

/// One of an artist's top tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_name: Option<String>,
    pub popularity: u32,
    /// Play count as reported by the web player (a decimal string).
    pub play_count: Option<String>,
    pub danceability: f64,
    pub energy: f64,
    pub acousticness: f64,
}

/// Result of one enrichment call, in CSV row order.
pub type ArtistsResult = Vec<ArtistRecord>;

/// Errors that can occur during an enrichment call.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The stored upload could not be read.
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    /// The upload is not valid CSV.
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The artist column is absent from the CSV header.
    #[error("CSV has no '{0}' column")]
    MissingColumn(String),

    /// Token exchange or client-token scrape failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with something we could not interpret.
    #[error("unexpected response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: &'static str, detail: String },

    /// The call did not finish in time.
    #[error("enrichment timed out after {0} seconds")]
    Timeout(u64),
}

pub type EnrichmentResult<T> = Result<T, EnrichmentError>;
