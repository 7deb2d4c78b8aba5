//! CSV upload service that enriches artist lists with Spotify data.

pub mod config;
pub mod enrichment;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upload;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
