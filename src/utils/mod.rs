//! Utility functions and helpers for json2sheet.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and API key redaction.
//! - `retry`: Retry with backoff that respects upstream `retryDelay` hints.
//!
//! Author: json2sheet contributors

pub mod logging;
pub mod retry;
