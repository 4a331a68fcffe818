//! Axum HTTP server for json2sheet.
//!
//! Exposes the generation endpoint, the cache management API, health and
//! Prometheus metrics.
//!
//! - `handlers`: one function per endpoint.
//! - `middleware`: request ID layers.
//! - `routes`: router and shared state.
//!
//! Author: json2sheet contributors

mod handlers;
mod middleware;
mod routes;

pub use handlers::{CleanupResponse, HealthResponse, HealthStatus, ListQuery, ListResponse};
pub use routes::{create_router, AppState};
