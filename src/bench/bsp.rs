//! Bulk-synchronous-parallel key-value benchmark
//!
//! Each trial picks a fresh key shared by every client. For each configured
//! phase all clients issue the same operation on that key at once, and the
//! phase ends only when every response is in. Racing inserts on one key is
//! what surfaces duplicate rows in models without a uniqueness guarantee.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use tracing::{debug, info};

use crate::bench::worker::Worker;
use crate::config::BenchConfig;
use crate::models::{BenchmarkResult, OpKind, OpMetrics};
use crate::{KvBenchError, Result};

const VALUE_LEN: usize = 16;

/// What to benchmark: one model with fixed sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchSpec {
    /// Model label
    pub model: String,
    /// Concurrent clients per phase
    pub parallelism: usize,
    /// Number of trials
    pub trials: usize,
}

impl BenchSpec {
    pub fn new(model: impl Into<String>, parallelism: usize, trials: usize) -> Self {
        Self {
            model: model.into(),
            parallelism,
            trials,
        }
    }

    /// Reject sizing that would issue no requests
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(KvBenchError::ConfigError(
                "Parallelism must be greater than 0".to_string(),
            ));
        }
        if self.trials == 0 {
            return Err(KvBenchError::ConfigError("Trials must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PhaseSamples {
    latencies: Vec<Duration>,
    errors: u64,
    elapsed: Duration,
}

/// Benchmark executor against one application server
pub struct BspBenchmark {
    client: Client,
    base_url: String,
    phases: Vec<OpKind>,
    key_prefix: String,
    show_progress: bool,
}

impl BspBenchmark {
    /// Create an executor for `base_url` with the default insert/update/get phases
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            phases: vec![OpKind::Insert, OpKind::Update, OpKind::Get],
            key_prefix: "bench".to_string(),
            show_progress: false,
        })
    }

    /// Create an executor for the application server on `host`, taking
    /// port and workload settings from `config`
    pub fn for_host(config: &BenchConfig, host: &str) -> Result<Self> {
        Ok(Self::new(config.app_url(host), config.request_timeout)?
            .with_phases(config.phases.clone())
            .with_key_prefix(config.key_prefix.clone())
            .with_progress(config.show_progress))
    }

    /// Set the operations issued per trial
    pub fn with_phases(mut self, phases: Vec<OpKind>) -> Self {
        self.phases = phases;
        self
    }

    /// Set the prefix of per-trial keys
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run all trials for `spec` and collect per-operation metrics
    pub async fn run(&self, spec: &BenchSpec) -> Result<BenchmarkResult> {
        spec.validate()?;
        if self.phases.is_empty() {
            return Err(KvBenchError::ConfigError("At least one phase is required".to_string()));
        }

        let progress = self.progress_bar(spec);
        self.run_with_progress(spec, &progress).await
    }

    /// Run the trials, clearing `progress` whether or not they succeed
    async fn run_with_progress(
        &self,
        spec: &BenchSpec,
        progress: &ProgressBar,
    ) -> Result<BenchmarkResult> {
        let outcome = self.run_trials(spec, progress).await;
        progress.finish_and_clear();
        outcome
    }

    async fn run_trials(&self, spec: &BenchSpec, progress: &ProgressBar) -> Result<BenchmarkResult> {
        let workers: Vec<Worker> = (0..spec.parallelism)
            .map(|_| Worker::with_client(self.client.clone(), &self.base_url, &spec.model))
            .collect();
        let mut rng = SmallRng::from_entropy();
        let mut samples: BTreeMap<OpKind, PhaseSamples> = BTreeMap::new();

        info!(
            model = %spec.model,
            parallelism = spec.parallelism,
            trials = spec.trials,
            "starting benchmark"
        );
        let start = Instant::now();

        for trial in 0..spec.trials {
            let key = format!("{}-{}", self.key_prefix, trial);

            for &op in &self.phases {
                let values: Vec<String> = (0..workers.len())
                    .map(|_| random_value(&mut rng))
                    .collect();

                let phase_start = Instant::now();
                let responses = join_all(
                    workers
                        .iter()
                        .zip(&values)
                        .map(|(w, value)| w.execute(op, &key, value)),
                )
                .await;
                let phase_elapsed = phase_start.elapsed();

                let entry = samples.entry(op).or_default();
                entry.elapsed += phase_elapsed;
                for response in responses {
                    let response = response?;
                    if !response.is_success() {
                        entry.errors += 1;
                    }
                    entry.latencies.push(response.latency);
                }
            }

            debug!(model = %spec.model, trial, "trial complete");
            progress.inc(1);
        }

        let elapsed = start.elapsed();

        let ops: BTreeMap<OpKind, OpMetrics> = samples
            .into_iter()
            .map(|(op, s)| (op, OpMetrics::from_samples(&s.latencies, s.errors, s.elapsed)))
            .collect();
        let result =
            BenchmarkResult::new(spec.model.clone(), spec.parallelism, spec.trials, elapsed, ops);

        info!(
            model = %spec.model,
            elapsed_secs = elapsed.as_secs_f64(),
            ops_per_sec = result.ops_per_sec(),
            errors = result.total_errors(),
            "benchmark complete"
        );
        Ok(result)
    }

    fn progress_bar(&self, spec: &BenchSpec) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(spec.trials as u64);
        let style = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len} trials ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(spec.model.clone());
        pb
    }
}

fn random_value(rng: &mut SmallRng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(VALUE_LEN)
        .map(char::from)
        .collect()
}
