//! KVBENCH - key-value model benchmark driver
//!
//! Resets a Postgres host and a Rails application host, then drives a
//! bulk-synchronous key-value workload against each data model variant and
//! counts the duplicate rows it leaves behind.

use std::fmt;

// Public re-exports
pub mod bench;
pub mod config;
pub mod driver;
pub mod models;
pub mod remote;
pub mod smoke;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum KvBenchError {
    /// Local I/O failed (spawning ssh, writing output)
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// HTTP transport error talking to the application server
    HttpError(reqwest::Error),
    /// A remote command exited unsuccessfully
    RemoteError(String),
    /// Benchmark execution error
    BenchmarkError(String),
    /// Output from a remote tool could not be understood
    ParseError(String),
}

impl fmt::Display for KvBenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvBenchError::IoError(err) => write!(f, "I/O error: {}", err),
            KvBenchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            KvBenchError::HttpError(err) => write!(f, "HTTP error: {}", err),
            KvBenchError::RemoteError(msg) => write!(f, "Remote command failed: {}", msg),
            KvBenchError::BenchmarkError(msg) => write!(f, "Benchmark error: {}", msg),
            KvBenchError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for KvBenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KvBenchError::IoError(err) => Some(err),
            KvBenchError::HttpError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KvBenchError {
    fn from(err: std::io::Error) -> Self {
        KvBenchError::IoError(err)
    }
}

impl From<reqwest::Error> for KvBenchError {
    fn from(err: reqwest::Error) -> Self {
        KvBenchError::HttpError(err)
    }
}

impl From<serde_json::Error> for KvBenchError {
    fn from(err: serde_json::Error) -> Self {
        KvBenchError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for KvBenchError {
    fn from(err: toml::de::Error) -> Self {
        KvBenchError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for KvBenchError {
    fn from(err: toml::ser::Error) -> Self {
        KvBenchError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for KVBENCH operations
pub type Result<T> = std::result::Result<T, KvBenchError>;

/// Error handling utilities
pub mod error {
    use super::KvBenchError;

    /// Convert error to an operator-facing message with a hint on what to fix
    pub fn user_friendly_message(error: &KvBenchError) -> String {
        match error {
            KvBenchError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your kvbench.toml or flags.", msg)
            }
            KvBenchError::RemoteError(msg) => format!(
                "Remote command failed: {}. Check ssh access and the command templates.",
                msg
            ),
            KvBenchError::HttpError(err) if err.is_connect() => {
                "Could not reach the application server. Is Passenger up on the configured port?"
                    .to_string()
            }
            KvBenchError::HttpError(err) if err.is_timeout() => {
                "Application server timed out. Try a longer request timeout or a longer server settle delay."
                    .to_string()
            }
            KvBenchError::IoError(err) if err.kind() == std::io::ErrorKind::NotFound => {
                format!("{}. Is the ssh program installed and on PATH?", err)
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "kvbench";
pub const CONFIG_FILE: &str = "kvbench.toml";
pub const DEFAULT_MODELS: [&str; 3] = ["indexed_key_value", "simple_key_value", "unique_key_value"];
