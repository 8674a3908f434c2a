//! Benchmark result data models
//!
//! Contains structures for per-model benchmark results, per-operation
//! metrics and latency statistics, and duplicate-row counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use crate::util::units::{calculate_ops_per_sec, format_latency, format_rate};

/// Key-value operation kinds issued against the application server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Insert,
    Update,
    Get,
    Delete,
}

impl OpKind {
    /// Short lowercase name used in output and config
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Insert => "insert",
            OpKind::Update => "update",
            OpKind::Get => "get",
            OpKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of benchmarking one model label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Timestamp when the benchmark finished
    pub timestamp: DateTime<Utc>,
    /// Model label benchmarked
    pub model: String,
    /// Concurrent clients per superstep
    pub parallelism: usize,
    /// Supersteps executed
    pub trials: usize,
    /// Wall time across all trials
    #[serde(with = "duration_serde")]
    pub elapsed_time: Duration,
    /// Metrics per operation kind
    pub ops: BTreeMap<OpKind, OpMetrics>,
}

/// Metrics for one operation kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpMetrics {
    /// Requests issued
    pub requests: u64,
    /// Requests answered with a non-success status
    pub errors: u64,
    /// Time spent inside this kind's supersteps
    #[serde(with = "duration_serde")]
    pub elapsed_time: Duration,
    /// Requests per second within this kind's supersteps
    pub ops_per_sec: f64,
    /// Latency statistics
    pub latency: LatencyStats,
}

/// Latency statistics with min/avg/max and percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Minimum latency observed
    #[serde(with = "duration_serde")]
    pub min: Duration,
    /// Average latency across all operations
    #[serde(with = "duration_serde")]
    pub avg: Duration,
    /// Maximum latency observed
    #[serde(with = "duration_serde")]
    pub max: Duration,
    /// Latency percentiles (50th, 95th, 99th)
    #[serde(with = "percentiles_serde")]
    pub percentiles: HashMap<u8, Duration>,
}

/// Rows left duplicated after a benchmark run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCount {
    /// Distinct keys stored more than once
    pub duplicated_keys: u64,
    /// Rows beyond the first for each duplicated key
    pub surplus_rows: u64,
}

impl BenchmarkResult {
    /// Create a new result stamped with the current time
    pub fn new(
        model: impl Into<String>,
        parallelism: usize,
        trials: usize,
        elapsed_time: Duration,
        ops: BTreeMap<OpKind, OpMetrics>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            model: model.into(),
            parallelism,
            trials,
            elapsed_time,
            ops,
        }
    }

    /// Total requests across all operation kinds
    pub fn total_requests(&self) -> u64 {
        self.ops.values().map(|m| m.requests).sum()
    }

    /// Total non-success responses across all operation kinds
    pub fn total_errors(&self) -> u64 {
        self.ops.values().map(|m| m.errors).sum()
    }

    /// Overall requests per second
    pub fn ops_per_sec(&self) -> f64 {
        calculate_ops_per_sec(self.total_requests(), self.elapsed_time)
    }

    /// Get a human-readable one-line summary of the result
    pub fn summary(&self) -> String {
        let per_op: Vec<String> = self
            .ops
            .iter()
            .map(|(kind, m)| format!("{} {} avg", kind, format_latency(m.latency.avg)))
            .collect();
        format!(
            "{} - {} - {} - {} errors - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.model,
            format_rate(self.ops_per_sec()),
            self.total_errors(),
            per_op.join(", ")
        )
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} trials x {} clients in {:.2}s",
            self.model,
            self.trials,
            self.parallelism,
            self.elapsed_time.as_secs_f64()
        )?;
        for (kind, m) in &self.ops {
            writeln!(
                f,
                "  {:<6} {:>6} req {:>4} err {:>14}  min {} avg {} p50 {} p95 {} p99 {} max {}",
                kind.as_str(),
                m.requests,
                m.errors,
                format_rate(m.ops_per_sec),
                format_latency(m.latency.min),
                format_latency(m.latency.avg),
                format_latency(m.latency.p50()),
                format_latency(m.latency.p95()),
                format_latency(m.latency.p99()),
                format_latency(m.latency.max),
            )?;
        }
        Ok(())
    }
}

impl OpMetrics {
    /// Build metrics from raw latency samples
    pub fn from_samples(samples: &[Duration], errors: u64, elapsed_time: Duration) -> Self {
        let requests = samples.len() as u64;
        Self {
            requests,
            errors,
            elapsed_time,
            ops_per_sec: calculate_ops_per_sec(requests, elapsed_time),
            latency: LatencyStats::from_samples(samples),
        }
    }
}

impl LatencyStats {
    /// Get the 50th percentile latency
    pub fn p50(&self) -> Duration {
        self.percentiles.get(&50).copied().unwrap_or(self.avg)
    }

    /// Get the 95th percentile latency
    pub fn p95(&self) -> Duration {
        self.percentiles.get(&95).copied().unwrap_or(self.max)
    }

    /// Get the 99th percentile latency
    pub fn p99(&self) -> Duration {
        self.percentiles.get(&99).copied().unwrap_or(self.max)
    }

    /// Create latency statistics from a list of samples
    pub fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort();
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let avg_nanos: u128 =
            sorted.iter().map(|d| d.as_nanos()).sum::<u128>() / sorted.len() as u128;
        let avg = Duration::from_nanos(avg_nanos as u64);

        let mut percentiles = HashMap::new();
        for p in [50u8, 95, 99] {
            let idx = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            percentiles.insert(p, sorted[idx]);
        }

        Self {
            min,
            avg,
            max,
            percentiles,
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            min: Duration::default(),
            avg: Duration::default(),
            max: Duration::default(),
            percentiles: HashMap::new(),
        }
    }
}

impl DuplicateCount {
    /// Whether the model kept every key unique
    pub fn is_clean(&self) -> bool {
        self.duplicated_keys == 0
    }
}

impl fmt::Display for DuplicateCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} duplicated keys ({} surplus rows)",
            self.duplicated_keys, self.surplus_rows
        )
    }
}

// Custom serde modules for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}

mod percentiles_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::time::Duration;

    pub fn serialize<S>(
        percentiles: &HashMap<u8, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos_map: HashMap<u8, u128> = percentiles
            .iter()
            .map(|(&k, &v)| (k, v.as_nanos()))
            .collect();
        nanos_map.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<u8, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos_map = HashMap::<u8, u128>::deserialize(deserializer)?;
        Ok(nanos_map
            .into_iter()
            .map(|(k, v)| (k, Duration::from_nanos(v as u64)))
            .collect())
    }
}
