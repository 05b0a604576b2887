//! Source resolution: fallback engine, result cache and the facade that
//! combines them.

pub mod cache;
pub mod engine;
pub mod facade;

pub use cache::{CacheEntry, CacheKey, CacheStatistics, ResolutionCache};
pub use engine::{
    AttemptRecord, ProbeFailure, ResolutionCancelled, ResolutionEngine, ResolutionPolicy,
    ResolutionResult,
};
pub use facade::{ResolutionFailure, ResolvedSource, SourceResolver};
