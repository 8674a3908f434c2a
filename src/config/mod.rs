//! Configuration management module
//!
//! Handles loading, saving, and validation of the benchmark run
//! configuration: target hosts, model labels, workload sizing, settle
//! delays, and the remote command templates.

use crate::models::OpKind;
use crate::{KvBenchError, Result, APP_NAME, CONFIG_FILE, DEFAULT_MODELS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Model labels benchmarked in order
    pub models: Vec<String>,
    /// Application server worker processes started before each model
    pub workers: usize,
    /// Concurrent clients per superstep
    pub parallelism: usize,
    /// Supersteps (trials) per model
    pub trials: usize,
    /// Operations issued in each trial, in order
    pub phases: Vec<OpKind>,
    /// Prefix for the per-trial shared key
    pub key_prefix: String,
    /// Wait after resetting the database
    #[serde(with = "humantime_serde")]
    pub database_settle: Duration,
    /// Wait after starting the application server
    #[serde(with = "humantime_serde")]
    pub server_settle: Duration,
    /// Per-request HTTP timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Whether to draw a progress bar while benchmarking
    pub show_progress: bool,
    /// Hosts under test
    pub hosts: HostsConfig,
    /// How remote commands are issued
    pub remote: RemoteConfig,
}

/// Host identifiers for the database and the application server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    /// Host running Postgres
    pub pg_host: String,
    /// Host running the Rails application under Passenger
    pub rails_host: String,
    /// HTTP port Passenger listens on
    pub app_port: u16,
}

/// Remote execution settings and command templates
///
/// Templates use `{name}` placeholders, see [`crate::remote::CommandTemplates`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Program used to reach remote hosts
    pub ssh_program: String,
    /// Remote login user, if not the local default
    pub user: Option<String>,
    /// Private key passed with `-i`
    pub identity_file: Option<PathBuf>,
    /// ssh port, if not 22
    pub ssh_port: Option<u16>,
    /// ssh connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Postgres database holding the model tables
    pub database: String,
    /// Rails application checkout on the application host
    pub app_dir: String,
    /// Rails environment Passenger runs in
    pub environment: String,
    /// Runs on the Postgres host to reset persisted state
    pub reset_database_command: String,
    /// Runs on the application host to (re)start the server pool
    pub start_server_command: String,
    /// Prefix for running a SQL statement with psql on the application host
    pub psql_command: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            workers: 10,
            parallelism: 10,
            trials: 100,
            phases: vec![OpKind::Insert, OpKind::Update, OpKind::Get],
            key_prefix: "bench".to_string(),
            database_settle: Duration::from_secs(4),
            server_settle: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            show_progress: true,
            hosts: HostsConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            pg_host: "localhost".to_string(),
            rails_host: "localhost".to_string(),
            app_port: 3000,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            user: None,
            identity_file: None,
            ssh_port: None,
            connect_timeout: Duration::from_secs(10),
            database: "kvbench_production".to_string(),
            app_dir: "~/kvbench".to_string(),
            environment: "production".to_string(),
            reset_database_command: "sudo service postgresql restart && sleep 1 && sudo -u postgres psql -d {database} -c 'TRUNCATE {tables} RESTART IDENTITY'".to_string(),
            start_server_command: "cd {app_dir} && (bundle exec passenger stop --port {port} || true) && bundle exec passenger start --daemonize --port {port} --environment {environment} --max-pool-size {workers} --min-instances {workers}".to_string(),
            psql_command: "psql -At -h {pg_host} -d {database} -c".to_string(),
        }
    }
}

impl BenchConfig {
    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.hosts.pg_host.trim().is_empty() {
            return Err(KvBenchError::ConfigError("Postgres host must not be empty".to_string()));
        }

        if self.hosts.rails_host.trim().is_empty() {
            return Err(KvBenchError::ConfigError("Rails host must not be empty".to_string()));
        }

        if self.hosts.app_port == 0 {
            return Err(KvBenchError::ConfigError("Application port must be greater than 0".to_string()));
        }

        // Labels end up in SQL table names and URL paths
        for model in &self.models {
            if !is_valid_model_label(model) {
                return Err(KvBenchError::ConfigError(format!(
                    "Invalid model label '{}': use lowercase letters, digits and underscores",
                    model
                )));
            }
        }

        const MAX_WORKERS: usize = 256;
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(KvBenchError::ConfigError(format!(
                "Worker process count must be between 1 and {}",
                MAX_WORKERS
            )));
        }

        const MAX_PARALLELISM: usize = 1024;
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(KvBenchError::ConfigError(format!(
                "Parallelism must be between 1 and {}",
                MAX_PARALLELISM
            )));
        }

        if self.trials == 0 {
            return Err(KvBenchError::ConfigError("Trials must be greater than 0".to_string()));
        }

        if self.phases.is_empty() {
            return Err(KvBenchError::ConfigError("At least one phase is required".to_string()));
        }

        // Keys are sent as URL path segments
        let prefix_ok = !self.key_prefix.is_empty()
            && self
                .key_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !prefix_ok {
            return Err(KvBenchError::ConfigError(format!(
                "Invalid key prefix '{}': use letters, digits, '-' and '_'",
                self.key_prefix
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(KvBenchError::ConfigError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.remote.ssh_program.trim().is_empty() {
            return Err(KvBenchError::ConfigError("ssh program must not be empty".to_string()));
        }

        Ok(())
    }

    /// Set the Postgres host
    pub fn with_pg_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.pg_host = host.into();
        self
    }

    /// Set the Rails host
    pub fn with_rails_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.rails_host = host.into();
        self
    }

    /// Set the model labels to benchmark
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the application server worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the number of concurrent clients
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the number of trials
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Set both settle delays
    pub fn with_settle_delays(mut self, database: Duration, server: Duration) -> Self {
        self.database_settle = database;
        self.server_settle = server;
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KvBenchError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            KvBenchError::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                KvBenchError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            KvBenchError::ConfigError(format!("Failed to write config file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/kvbench/kvbench.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            KvBenchError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Base URL of the application server listening on `host`
    pub fn app_url(&self, host: &str) -> String {
        format!("http://{}:{}", host, self.hosts.app_port)
    }
}

/// Model labels are lowercase identifiers
pub fn is_valid_model_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !label.starts_with(|c: char| c.is_ascii_digit())
}

// Durations are written the way operators type them: "4s", "500ms", "1m 30s"
mod humantime_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(D::Error::custom)
    }
}
