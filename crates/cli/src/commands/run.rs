//! `stepwright run`: load test data, run the scenarios, write the results

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use stepwright_e2e::playwright::Browser;
use stepwright_e2e::{data, preflight, CaseFilter, RunConfig, ScenarioRunner, TestSuiteResult};
use tracing::{info, warn};

use crate::output::{self, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, default_value = "stepwright.toml")]
    pub config: PathBuf,

    /// Directory with JSON/YAML test data
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Only run cases carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Only run the case with this name
    #[arg(long)]
    pub name: Option<String>,

    /// URL of the application under test
    #[arg(long, env = "STEPWRIGHT_BASE_URL")]
    pub base_url: Option<String>,

    /// Browser engine: chromium, firefox or webkit
    #[arg(long, env = "STEPWRIGHT_BROWSER")]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Scenarios run concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    /// Results directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Do not probe the base URL before starting browsers
    #[arg(long)]
    pub skip_preflight: bool,
}

impl RunArgs {
    /// Flags and environment override the configuration file
    fn apply(&self, config: &mut RunConfig) {
        if let Some(data) = &self.data {
            config.data_dir = data.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.skip_preflight {
            config.preflight.enabled = false;
        }
    }

    fn filter(&self) -> CaseFilter {
        CaseFilter {
            tag: self.tag.clone(),
            name: self.name.clone(),
        }
    }
}

pub async fn execute(args: RunArgs, format: OutputFormat) -> anyhow::Result<TestSuiteResult> {
    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate()?;

    if config.preflight.enabled {
        let timeout = Duration::from_secs(config.preflight.timeout_secs);
        preflight::wait_for_target(&config.base_url, timeout)
            .await
            .context("preflight check")?;
    }

    let files = data::load_dir(&config.data_dir)?;
    info!("Loaded {} data file(s) from {}", files.len(), config.data_dir.display());

    let filter = args.filter();
    let runner = ScenarioRunner::new(config);
    let suite = runner
        .run_search_suite(&runner.config().playwright, files, &filter)
        .await;

    if suite.total == 0 {
        warn!("No scenarios matched");
    }

    let summary = runner.write_results(&suite)?;
    output::print_summary(&suite, format);
    if matches!(format, OutputFormat::Table) {
        output::print_info(&format!("Results written to {}", summary.display()));
    }

    Ok(suite)
}
