//! Benchmark engine module
//!
//! Contains the key-value HTTP worker and the bulk-synchronous-parallel
//! benchmark that drives many workers in lockstep.

pub mod bsp;
pub mod worker;

// Re-export commonly used types
pub use bsp::{BenchSpec, BspBenchmark};
pub use worker::{KvResponse, Worker};
