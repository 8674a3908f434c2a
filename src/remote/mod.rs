//! Remote host control module
//!
//! Drives the real infrastructure: ssh for database resets, server starts
//! and duplicate queries, HTTP for the benchmark itself.

pub mod commands;
pub mod ssh;

pub use commands::{parse_duplicate_count, CommandTemplates};
pub use ssh::SshRunner;

use async_trait::async_trait;
use tracing::info;

use crate::bench::{BenchSpec, BspBenchmark, Worker};
use crate::config::BenchConfig;
use crate::driver::HostControl;
use crate::models::{BenchmarkResult, DuplicateCount};
use crate::smoke::{run_smoke, SmokeStep};
use crate::Result;

/// Production [`HostControl`] backed by ssh and the HTTP benchmark
pub struct RemoteHosts {
    ssh: SshRunner,
    templates: CommandTemplates,
    config: BenchConfig,
}

impl RemoteHosts {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            ssh: SshRunner::from_config(&config.remote),
            templates: CommandTemplates::from_config(config),
            config: config.clone(),
        }
    }

    pub fn templates(&self) -> &CommandTemplates {
        &self.templates
    }

}

#[async_trait]
impl HostControl for RemoteHosts {
    async fn reset_database(&self, host: &str) -> Result<()> {
        info!(host, "resetting postgres");
        self.ssh.run(host, &self.templates.reset_database()).await?;
        Ok(())
    }

    async fn start_server(&self, host: &str, workers: usize) -> Result<()> {
        info!(host, workers, "starting passenger");
        self.ssh
            .run(host, &self.templates.start_server(workers))
            .await?;
        Ok(())
    }

    async fn run_benchmark(&self, host: &str, spec: &BenchSpec) -> Result<BenchmarkResult> {
        BspBenchmark::for_host(&self.config, host)?.run(spec).await
    }

    async fn count_duplicates(&self, host: &str, model: &str) -> Result<DuplicateCount> {
        let output = self
            .ssh
            .run(host, &self.templates.count_duplicates(model))
            .await?;
        parse_duplicate_count(&output)
    }

    async fn smoke(&self, host: &str, model: &str) -> Result<Vec<SmokeStep>> {
        let worker = Worker::new(&self.config.app_url(host), model, self.config.request_timeout)?;
        run_smoke(&worker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_follow_config() {
        let config = BenchConfig::default().with_rails_host("app.internal");
        let hosts = RemoteHosts::from_config(&config);
        assert!(hosts.templates().start_server(3).contains("--max-pool-size 3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reset_and_start_run_through_ssh_program() {
        let mut config = BenchConfig::default();
        config.remote.ssh_program = "true".to_string();
        let hosts = RemoteHosts::from_config(&config);
        hosts.reset_database("db.internal").await.unwrap();
        hosts.start_server("app.internal", 10).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_count_duplicates_surfaces_parse_errors() {
        // `true` prints nothing, which is not a valid duplicate summary
        let mut config = BenchConfig::default();
        config.remote.ssh_program = "true".to_string();
        let hosts = RemoteHosts::from_config(&config);
        let err = hosts
            .count_duplicates("app.internal", "simple_key_value")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::KvBenchError::ParseError(_)));
    }
}
