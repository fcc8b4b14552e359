//! Cross-cutting HTTP middleware.
//!
//! Request logging with latency tracking. Authorization gates live in `auth::middleware`.

pub mod logging;

pub use logging::request_logging;
