//! HTTP request handlers organized by functionality

pub mod api;
pub mod errors;

// Re-export handler functions
pub use api::{StreamQuery, StreamResponse, api_cache_stats, api_providers, api_stream, health};
pub use errors::{ApiError, AttemptView};
