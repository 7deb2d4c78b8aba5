//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, tracing span)
//!     → security::rate_limit (per-client budgets)
//!     → handlers.rs (form view, upload pipeline)
//!     → failure.rs (failure → status, flash message)
//!     → render.rs (HTML views)
//! ```

pub mod failure;
pub mod flash;
pub mod handlers;
pub mod render;
pub mod request;
pub mod server;

pub use failure::RequestFailure;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
