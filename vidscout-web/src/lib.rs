//! Vidscout Web - JSON API Server
//!
//! Exposes source resolution to the rendering layer over HTTP. The player
//! page asks `/api/stream` for an embed URL and renders a retry affordance
//! whenever the answer is not a 200.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]

pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, build_router, run_server};
