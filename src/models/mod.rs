//! Data models module
//!
//! Contains benchmark result data models, per-operation metrics,
//! and duplicate-count results.

pub mod result;

// Re-export commonly used types
pub use result::{BenchmarkResult, DuplicateCount, LatencyStats, OpKind, OpMetrics};
