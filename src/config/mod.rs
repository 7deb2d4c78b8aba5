//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!
//! process environment / .env
//!     → credentials.rs (client id + secret, read once)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod credentials;
pub mod loader;
pub mod schema;
pub mod validation;

pub use credentials::ApiCredentials;
pub use schema::AppConfig;
pub use schema::EnrichmentConfig;
pub use schema::RateLimitConfig;
pub use schema::UploadConfig;
