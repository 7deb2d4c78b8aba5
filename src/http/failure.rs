//! Request failure taxonomy and its user-facing mapping.
//!
//! `user_message` is the only place user-visible failure text comes from.
//! Storage and processing failures share one generic message; their detail
//! goes to the log only.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::enrichment::EnrichmentError;
use crate::http::flash::{redirect_with_flash, Flash};
use crate::http::render;
use crate::upload::{StorageError, ValidationError};

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing the file. Please try again.";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Terminal failure of one upload request.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("upload rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("temp storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("enrichment failed: {0}")]
    Processing(#[from] EnrichmentError),
}

impl RequestFailure {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestFailure::RateLimited { .. } => "rate_limited",
            RequestFailure::Validation(_) => "validation_error",
            RequestFailure::Storage(_) => "storage_error",
            RequestFailure::Processing(_) => "processing_error",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            RequestFailure::RateLimited { .. } => RATE_LIMITED_MESSAGE.to_string(),
            RequestFailure::Validation(e) => e.to_string(),
            RequestFailure::Storage(_) | RequestFailure::Processing(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RequestFailure::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::SEE_OTHER,
        }
    }
}

impl IntoResponse for RequestFailure {
    fn into_response(self) -> Response {
        let flash = Flash::error(self.user_message());
        match self {
            RequestFailure::RateLimited { retry_after } => {
                // Round up so clients never retry a moment too early.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Html(render::index_page(Some(&flash))),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            _ => redirect_with_flash("/", &flash),
        }
    }
}
