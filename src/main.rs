use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kvbench::config::BenchConfig;
use kvbench::driver::{Driver, RunPlan};
use kvbench::error::user_friendly_message;
use kvbench::remote::RemoteHosts;
use kvbench::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to a kvbench.toml. Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host running Postgres.
    #[arg(long)]
    pg_host: Option<String>,

    /// Host running the Rails application.
    #[arg(long)]
    rails_host: Option<String>,

    /// Comma-separated model labels, benchmarked in order.
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// Application server worker processes. Defaults to 10.
    #[arg(long)]
    workers: Option<usize>,

    /// Concurrent clients per phase. Defaults to 10.
    #[arg(long)]
    parallelism: Option<usize>,

    /// Trials per model. Defaults to 100.
    #[arg(long)]
    trials: Option<usize>,

    /// Don't draw progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Issue one request per endpoint for each model instead of benchmarking.
    #[arg(long)]
    smoke: bool,
}

impl Cli {
    fn load_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load_from(path)?,
            None => BenchConfig::load()?,
        };

        if let Some(host) = &self.pg_host {
            config = config.with_pg_host(host.clone());
        }
        if let Some(host) = &self.rails_host {
            config = config.with_rails_host(host.clone());
        }
        if let Some(models) = &self.models {
            config = config.with_models(models.clone());
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(parallelism) = self.parallelism {
            config = config.with_parallelism(parallelism);
        }
        if let Some(trials) = self.trials {
            config = config.with_trials(trials);
        }
        if self.no_progress {
            config = config.with_progress(false);
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let driver = Driver::new(RemoteHosts::from_config(&config), RunPlan::from_config(&config));
    let mut out = std::io::stdout();

    if cli.smoke {
        driver.smoke(&mut out).await?;
        return Ok(());
    }

    let run = driver.run(&mut out).await?;
    for model in &config.models {
        if let Some(result) = run.results.get(model) {
            println!("{}", result.summary());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kvbench=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "run aborted");
            eprintln!("{}", user_friendly_message(&err));
            ExitCode::FAILURE
        }
    }
}
