//! Utility functions module
//!
//! Contains helpers for formatting rates and latencies.

pub mod units;

// Re-export commonly used functions
pub use units::{calculate_ops_per_sec, format_latency, format_rate};
