//! Benchmark run orchestration
//!
//! Sequences host resets, benchmarks and duplicate counts for each model
//! label. All side effects go through [`HostControl`], so the sequencing
//! can be exercised against fakes.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;

use crate::bench::BenchSpec;
use crate::config::BenchConfig;
use crate::models::{BenchmarkResult, DuplicateCount};
use crate::smoke::{write_smoke, SmokeStep};
use crate::Result;

/// External collaborators the driver depends on
#[async_trait]
pub trait HostControl {
    /// Reset persisted database state on `host`
    async fn reset_database(&self, host: &str) -> Result<()>;

    /// Start or restart the application server pool on `host`
    async fn start_server(&self, host: &str, workers: usize) -> Result<()>;

    /// Benchmark one model against the application server on `host`
    async fn run_benchmark(&self, host: &str, spec: &BenchSpec) -> Result<BenchmarkResult>;

    /// Count duplicated rows left behind for `model`
    async fn count_duplicates(&self, host: &str, model: &str) -> Result<DuplicateCount>;

    /// Hit each key-value endpoint of `model` once on `host`
    async fn smoke(&self, host: &str, model: &str) -> Result<Vec<SmokeStep>>;
}

/// Everything the driver needs from the configuration
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub pg_host: String,
    pub rails_host: String,
    pub models: Vec<String>,
    pub workers: usize,
    pub parallelism: usize,
    pub trials: usize,
    pub database_settle: Duration,
    pub server_settle: Duration,
}

impl RunPlan {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            pg_host: config.hosts.pg_host.clone(),
            rails_host: config.hosts.rails_host.clone(),
            models: config.models.clone(),
            workers: config.workers,
            parallelism: config.parallelism,
            trials: config.trials,
            database_settle: config.database_settle,
            server_settle: config.server_settle,
        }
    }

    /// Benchmark parameters for one model; the same for every label
    pub fn spec_for(&self, model: &str) -> BenchSpec {
        BenchSpec::new(model, self.parallelism, self.trials)
    }
}

/// Results accumulated over one run, keyed by model label
#[derive(Debug, Default)]
pub struct RunResults {
    pub results: HashMap<String, BenchmarkResult>,
    pub duplicates: HashMap<String, DuplicateCount>,
}

/// Sequential benchmark driver
pub struct Driver<C> {
    control: C,
    plan: RunPlan,
}

impl<C: HostControl> Driver<C> {
    pub fn new(control: C, plan: RunPlan) -> Self {
        Self { control, plan }
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Reset the database, let it settle, start the server, let it settle
    pub async fn reset_hosts<W: Write>(&self, workers: usize, out: &mut W) -> Result<()> {
        writeln!(out, "Starting PG")?;
        self.control.reset_database(&self.plan.pg_host).await?;
        sleep(self.plan.database_settle).await;

        writeln!(out, "Starting rails")?;
        self.control.start_server(&self.plan.rails_host, workers).await?;
        sleep(self.plan.server_settle).await;
        Ok(())
    }

    /// Run every model in order, writing progress markers to `out`
    ///
    /// The first error aborts the whole run.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<RunResults> {
        let mut run = RunResults::default();
        writeln!(out, "Starting bench")?;

        for model in &self.plan.models {
            writeln!(out, "STARTING")?;
            writeln!(out, "{}", model)?;
            writeln!(out, "...")?;

            self.reset_hosts(self.plan.workers, out).await?;

            let spec = self.plan.spec_for(model);
            let result = self
                .control
                .run_benchmark(&self.plan.rails_host, &spec)
                .await?;
            info!(model = %model, summary = %result.summary(), "model benchmarked");
            run.results.insert(model.clone(), result);

            let dups = self
                .control
                .count_duplicates(&self.plan.rails_host, model)
                .await?;
            writeln!(out, "{}", dups)?;
            run.duplicates.insert(model.clone(), dups);
        }

        Ok(run)
    }

    /// Smoke-test every model in order against freshly reset hosts
    ///
    /// Prints the same per-model markers as [`Driver::run`], followed by
    /// one line per request instead of a duplicate count.
    pub async fn smoke<W: Write>(&self, out: &mut W) -> Result<HashMap<String, Vec<SmokeStep>>> {
        let mut responses = HashMap::new();
        writeln!(out, "Starting bench")?;

        for model in &self.plan.models {
            writeln!(out, "STARTING")?;
            writeln!(out, "{}", model)?;
            writeln!(out, "...")?;

            self.reset_hosts(self.plan.workers, out).await?;

            let steps = self.control.smoke(&self.plan.rails_host, model).await?;
            write_smoke(out, &steps)?;
            responses.insert(model.clone(), steps);
        }

        Ok(responses)
    }
}
