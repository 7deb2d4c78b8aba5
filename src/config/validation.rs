//! Configuration validation.
//!
//! Returns every problem found, not just the first. Runs before the config is
//! accepted into the system.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::security::rate_limit::Budget;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let upload = &config.upload;
    if upload.max_body_bytes == 0 {
        errors.push(ValidationError::new("upload.max_body_bytes", "must be greater than zero"));
    }
    if upload.temp_dir.trim().is_empty() {
        errors.push(ValidationError::new("upload.temp_dir", "must not be empty"));
    }
    if upload.allowed_extensions.is_empty() {
        errors.push(ValidationError::new("upload.allowed_extensions", "must list at least one extension"));
    }
    for ext in &upload.allowed_extensions {
        let bare = ext.trim_start_matches('.');
        if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(ValidationError::new(
                "upload.allowed_extensions",
                format!("'{ext}' is not a plain extension"),
            ));
        }
    }

    let rate_limit = &config.rate_limit;
    for (field, specs) in [
        ("rate_limit.default_limits", &rate_limit.default_limits),
        ("rate_limit.upload_limits", &rate_limit.upload_limits),
    ] {
        for spec in specs {
            if let Err(e) = spec.parse::<Budget>() {
                errors.push(ValidationError::new(field, e.to_string()));
            }
        }
    }
    if rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be greater than zero"));
    }

    let enrichment = &config.enrichment;
    if enrichment.timeout_secs == 0 {
        errors.push(ValidationError::new("enrichment.timeout_secs", "must be greater than zero"));
    }
    if enrichment.http_timeout_secs == 0 {
        errors.push(ValidationError::new("enrichment.http_timeout_secs", "must be greater than zero"));
    }
    if enrichment.top_tracks_limit == 0 {
        errors.push(ValidationError::new("enrichment.top_tracks_limit", "must be greater than zero"));
    }
    if enrichment.artist_column.trim().is_empty() {
        errors.push(ValidationError::new("enrichment.artist_column", "must not be empty"));
    }
    for (field, value) in [
        ("enrichment.token_url", &enrichment.token_url),
        ("enrichment.api_base_url", &enrichment.api_base_url),
        ("enrichment.partner_api_url", &enrichment.partner_api_url),
        ("enrichment.web_player_url", &enrichment.web_player_url),
    ] {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(field, format!("'{value}': {e}")));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    } else if config.timeouts.request_secs <= enrichment.timeout_secs {
        // The route timeout answers with a bare 408; enrichment must give up first.
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed enrichment.timeout_secs ({}s), got {}s",
                enrichment.timeout_secs, config.timeouts.request_secs
            ),
        ));
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.to_ascii_lowercase().as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("'{}' is not one of pretty, json", observability.log_format),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
