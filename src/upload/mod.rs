//! Upload intake subsystem.
//!
//! # Data Flow
//! ```text
//! multipart field "file"
//!     → validator.rs (filename present, extension allowed)
//!     → store.rs (sanitize, write to per-request path)
//!     → enrichment call reads the stored path
//!     → store.rs removes the file on every exit path
//! ```

pub mod store;
pub mod validator;

pub use store::{sanitize_filename, StorageError, StoredFile, TransientFileStore};
pub use validator::{AcceptedFile, UploadValidator, UploadedFile, ValidationError};
