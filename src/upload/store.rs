//! Transient per-request file storage.
//!
//! An accepted upload is written to `<temp_dir>/<token>-<sanitized name>`,
//! handed to the caller's closure, and removed once the closure finishes.
//! The request token keeps concurrent uploads with the same name apart.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::observability::metrics;
use crate::upload::validator::AcceptedFile;

const MAX_STEM_LEN: usize = 64;

/// Errors raised while persisting an upload.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to prepare temp directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write upload to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid request token '{0}'")]
    InvalidToken(String),
}

/// Reduce a client filename to a safe basename.
///
/// Directory components are dropped, characters outside `[A-Za-z0-9._-]`
/// become `_`, and leading dots are stripped. Never returns an empty name.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    let capped = if cleaned.len() > MAX_STEM_LEN {
        // ASCII only at this point, so byte slicing is safe.
        &cleaned[cleaned.len() - MAX_STEM_LEN..]
    } else {
        cleaned.as_str()
    };
    // After capping, so the kept tail cannot start with a dot either.
    let cleaned = capped.trim_start_matches('.');

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Owns a temp file for one request.
///
/// [`StoredFile::release`] removes it and reports failures; dropping an
/// unreleased handle removes it synchronously as a fallback, which covers
/// panics and cancelled futures.
#[derive(Debug)]
pub struct StoredFile {
    path: PathBuf,
    released: bool,
}

impl StoredFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file. A file that is already gone counts as removed.
    pub async fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StoredFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed abandoned temp file");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                metrics::record_cleanup_failure();
                tracing::error!(path = %self.path.display(), error = %e, "Failed to remove abandoned temp file");
            }
        }
    }
}

/// Scoped storage for uploaded files.
#[derive(Debug, Clone)]
pub struct TransientFileStore {
    dir: PathBuf,
}

impl TransientFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the temp directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::CreateDir { path: self.dir.clone(), source })
    }

    /// Path an upload would be stored at for the given request token.
    pub fn path_for(&self, file: &AcceptedFile, token: &str) -> Result<PathBuf, StorageError> {
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(StorageError::InvalidToken(token.to_string()));
        }
        Ok(self.dir.join(format!("{}-{}", token, sanitize_filename(&file.file_name))))
    }

    /// Write the upload, run `f` with its path, and remove the file afterwards.
    ///
    /// A failed removal is logged and counted but does not replace `f`'s result.
    pub async fn with_stored_file<F, Fut, R>(
        &self,
        file: &AcceptedFile,
        token: &str,
        f: F,
    ) -> Result<R, StorageError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut stored = self.store(file, token).await?;
        let outcome = f(stored.path.clone()).await;

        if let Err(e) = stored.release().await {
            metrics::record_cleanup_failure();
            tracing::error!(
                path = %stored.path.display(),
                error = %e,
                "Failed to remove temp file after processing"
            );
        }

        Ok(outcome)
    }

    async fn store(&self, file: &AcceptedFile, token: &str) -> Result<StoredFile, StorageError> {
        let path = self.path_for(file, token)?;
        // Guard first so a partial write is still cleaned up.
        let stored = StoredFile { path, released: false };

        tokio::fs::write(&stored.path, &file.content)
            .await
            .map_err(|source| StorageError::Write { path: stored.path.clone(), source })?;

        tracing::debug!(
            path = %stored.path.display(),
            bytes = file.content.len(),
            "Stored upload"
        );
        Ok(stored)
    }
}
