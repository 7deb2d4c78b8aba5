//! Upload acceptance checks.
//!
//! The check is lexical only: the last `.`-delimited segment of the client
//! filename, lower-cased, must be in the allow-list. Content is neither parsed
//! nor sniffed here.

use bytes::Bytes;
use thiserror::Error;

/// A file part as received from the client.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied filename. Untrusted.
    pub file_name: Option<String>,
    pub content: Bytes,
}

/// An upload whose filename passed validation.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    /// Original filename, unchanged.
    pub file_name: String,
    /// Lower-cased extension that matched the allow-list.
    pub extension: String,
    pub content: Bytes,
}

/// Reasons an upload is rejected. The display text is shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file format. Please upload a CSV file.")]
    UnsupportedExtension,

    #[error("File is too large.")]
    PayloadTooLarge,

    #[error("Could not read the uploaded file. Please try again.")]
    MalformedUpload,
}

/// Decides whether a submitted file is acceptable.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new<I, S>(allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Validate a file part; `None` means the form carried no file field.
    pub fn validate(&self, submitted: Option<UploadedFile>) -> Result<AcceptedFile, ValidationError> {
        let file = submitted.ok_or(ValidationError::NoFileSelected)?;
        let file_name = match file.file_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ValidationError::NoFileSelected),
        };

        let extension = self
            .allowed_extension(&file_name)
            .ok_or(ValidationError::UnsupportedExtension)?;

        Ok(AcceptedFile {
            file_name,
            extension,
            content: file.content,
        })
    }

    fn allowed_extension(&self, file_name: &str) -> Option<String> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.contains(&ext).then_some(ext)
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(["csv"])
    }
}
