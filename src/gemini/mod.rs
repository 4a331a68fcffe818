// Gemini API client module
// Author: json2sheet contributors

mod client;

pub use client::{block_to_content, GeminiClient};
