//! Startup orchestration.
//!
//! Order: configuration, then credentials, then the enricher, then the
//! server. Any failure here is fatal; nothing is listening yet.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::credentials::CredentialsError;
use crate::config::loader::{load_config, ConfigError};
use crate::config::{ApiCredentials, AppConfig};
use crate::enrichment::{EnrichmentError, SpotifyEnricher};
use crate::http::{HttpServer, ServerError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("missing API credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("failed to build enrichment client: {0}")]
    Enricher(#[from] EnrichmentError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Load the config file if one was given, defaults otherwise.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            let config = AppConfig::default();
            crate::config::validation::validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Build the production server: env credentials and the Spotify enricher.
pub fn build_server(config: AppConfig) -> Result<HttpServer, StartupError> {
    let credentials = ApiCredentials::from_env()?;
    tracing::info!(client_id = %credentials.client_id(), "API credentials loaded");

    let enricher = Arc::new(SpotifyEnricher::new(config.enrichment.clone())?);
    Ok(HttpServer::new(config, credentials, enricher)?)
}
