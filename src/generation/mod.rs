// Generation service module
// Author: json2sheet contributors

pub mod service;

pub use service::{
    cacheable_content, ContentGenerator, GenerateOptions, Generation, GenerationRequest,
    GenerationResponse, GenerationService,
};
