//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the enrichment service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upload handling (size cap, temp directory, allowed extensions).
    pub upload: UploadConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// External enrichment call settings.
    pub enrichment: EnrichmentConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Directory holding per-request temporary files.
    pub temp_dir: String,

    /// Accepted file extensions (compared lower-cased).
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            temp_dir: std::env::temp_dir()
                .join("artist-enricher")
                .to_string_lossy()
                .into_owned(),
            allowed_extensions: vec!["csv".to_string()],
        }
    }
}

/// Rate limiting configuration.
///
/// Budgets use the "N per unit" notation, e.g. `"50 per hour"` or `"10/minute"`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Budgets applied to every limited route.
    pub default_limits: Vec<String>,

    /// Extra budgets applied to the upload route only.
    pub upload_limits: Vec<String>,

    /// How often idle client windows are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limits: vec!["200 per day".to_string(), "50 per hour".to_string()],
            upload_limits: vec!["10 per minute".to_string()],
            sweep_interval_secs: 300,
        }
    }
}

/// Enrichment (Spotify) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Upper bound for one whole enrichment call, in seconds.
    pub timeout_secs: u64,

    /// Timeout for each individual HTTP call, in seconds.
    pub http_timeout_secs: u64,

    /// Number of top tracks kept per artist.
    pub top_tracks_limit: usize,

    /// CSV column holding the artist names.
    pub artist_column: String,

    pub token_url: String,
    pub api_base_url: String,
    pub partner_api_url: String,
    pub web_player_url: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            http_timeout_secs: 10,
            top_tracks_limit: 5,
            artist_column: "Performer 1 Name".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base_url: "https://api.spotify.com/v1".to_string(),
            partner_api_url: "https://api-partner.spotify.com/pathfinder/v1/query".to_string(),
            web_player_url: "https://open.spotify.com/".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 180 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}
