//! Route handlers for the upload form.
//!
//! # Request flow (POST /)
//! ```text
//! Start → RateChecked   rate_limit_middleware (429 on denial, no disk access)
//!       → Validated     UploadValidator on the "file" part
//!       → Stored        TransientFileStore::with_stored_file
//!       → Enriched      Enricher under a timeout
//!       → Rendered      results page; temp file already removed
//! Any failure → RequestFailure → redirect to the form with a flash message
//! ```

use std::time::Instant;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use bytes::Bytes;
use uuid::Uuid;

use crate::enrichment::{enrich_with_timeout, ArtistsResult};
use crate::http::failure::RequestFailure;
use crate::http::flash::{clear_flash_cookie, read_flash};
use crate::http::render;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upload::{UploadedFile, ValidationError};

const FILE_FIELD: &str = "file";

/// GET / — the upload form, showing and clearing any pending flash message.
pub async fn index(headers: HeaderMap) -> Response {
    let flash = read_flash(&headers);
    let mut response = Html(render::index_page(flash.as_ref())).into_response();
    if flash.is_some() {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, clear_flash_cookie());
    }
    response
}

/// POST / — validate, store, enrich, render.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();

    match process_upload(&state, multipart).await {
        Ok(artists) => {
            tracing::info!(
                request_id = %request_id,
                artists = artists.len(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Upload processed"
            );
            metrics::record_request("success");
            Html(render::results_page(&artists)).into_response()
        }
        Err(failure) => {
            match &failure {
                RequestFailure::Validation(e) => {
                    tracing::info!(request_id = %request_id, reason = %e, "Upload rejected");
                }
                other => {
                    tracing::error!(request_id = %request_id, kind = other.kind(), error = %other, "Upload failed");
                }
            }
            metrics::record_request(failure.kind());
            failure.into_response()
        }
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn process_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ArtistsResult, RequestFailure> {
    let submitted = match multipart {
        Ok(multipart) => read_file_part(multipart).await?,
        // Not a multipart body at all: same as a form without a file.
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Request body is not multipart");
            None
        }
    };

    let accepted = state.validator.validate(submitted)?;

    // Fresh per request, independent of client-supplied headers.
    let token = Uuid::new_v4().to_string();
    let outcome = state
        .store
        .with_stored_file(&accepted, &token, |path| async move {
            enrich_with_timeout(
                state.enricher.as_ref(),
                &path,
                &state.credentials,
                state.enrichment_timeout,
            )
            .await
        })
        .await?;

    Ok(outcome?)
}

/// Pull the `file` part out of the form. Other parts are skipped.
async fn read_file_part(mut multipart: Multipart) -> Result<Option<UploadedFile>, ValidationError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content: Bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(UploadedFile { file_name, content }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::PayloadTooLarge
    } else {
        tracing::debug!(error = %e, "Malformed multipart body");
        ValidationError::MalformedUpload
    }
}
