//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (check per-IP budgets, 429 when exhausted)
//!     → body limit layer (reject oversized uploads)
//!     → Pass to handler
//! Outgoing response:
//!     → headers.rs (hardening headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input (filenames are sanitized before touching disk)

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{Budget, RateDecision, RateLimiter};
