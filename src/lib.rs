// json2sheet - AI-assisted JSON to Excel backend with Gemini context caching
// Author: json2sheet contributors

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod metrics;
pub mod models;
pub mod server;
pub mod utils;
