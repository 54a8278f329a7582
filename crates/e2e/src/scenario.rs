//! Scenario runner: runs step bodies against data records, classifies the
//! outcome and writes the results

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use stepwright_report::{
    Link, ReportTree, ResultsWriter, ScenarioReport, ScenarioStatus, StepContext,
};
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::data::{DataFile, SearchCase};
use crate::driver::{Driver, DriverFactory};
use crate::error::{E2eError, E2eResult};
use crate::pages::SearchPage;
use crate::steps;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub status: ScenarioStatus,
    pub duration_ms: u64,
    pub error: Option<String>,

    /// Data file the scenario's record came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    #[serde(skip)]
    pub report: Option<ScenarioReport>,
}

impl ScenarioResult {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub timed_out: usize,
    pub setup_failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let count = |status: ScenarioStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            broken: count(ScenarioStatus::Broken),
            timed_out: count(ScenarioStatus::TimedOut),
            setup_failed: count(ScenarioStatus::SetupFailed),
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.passed == self.total
    }
}

/// Which cases of the loaded data to run
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub tag: Option<String>,
    pub name: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &SearchCase) -> bool {
        self.matches_record(Some(&case.name), &case.tags)
    }

    /// Match on whatever could be read from a record; a set criterion that
    /// cannot be checked does not match.
    pub fn matches_record(&self, name: Option<&str>, tags: &[String]) -> bool {
        self.tag.as_deref().map_or(true, |t| tags.iter().any(|tag| tag == t))
            && self.name.as_deref().map_or(true, |n| name == Some(n))
    }
}

fn classify(outcome: &E2eResult<()>) -> ScenarioStatus {
    match outcome {
        Ok(()) => ScenarioStatus::Passed,
        Err(E2eError::ScenarioTimeout { .. }) => ScenarioStatus::TimedOut,
        Err(e) if e.is_assertion() => ScenarioStatus::Failed,
        Err(e) if e.is_setup() => ScenarioStatus::SetupFailed,
        Err(_) => ScenarioStatus::Broken,
    }
}

enum Job {
    Run { case: SearchCase, source: PathBuf },
    Invalid { name: String, source: PathBuf, error: E2eError },
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Main scenario runner
pub struct ScenarioRunner {
    config: RunConfig,
}

impl ScenarioRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run one scenario body with a fresh report tree.
    ///
    /// `driver`, when given, is used for the failure screenshot.
    pub async fn run<F, Fut>(
        &self,
        name: &str,
        driver: Option<&Arc<dyn Driver>>,
        body: F,
    ) -> ScenarioResult
    where
        F: FnOnce(StepContext) -> Fut,
        Fut: Future<Output = E2eResult<()>>,
    {
        let start = Instant::now();
        debug!("Running scenario: {}", name);

        let tree = Arc::new(ReportTree::new());
        let ctx = StepContext::new(name, tree.clone());

        let seconds = self.config.scenario_timeout_secs;
        let limit = Duration::from_secs(seconds);
        let outcome = match tokio::time::timeout(limit, body(ctx.clone())).await {
            Ok(outcome) => outcome,
            Err(_) => Err(E2eError::ScenarioTimeout { seconds }),
        };
        let status = classify(&outcome);

        if !status.is_success() && self.config.screenshot_on_failure {
            if let Some(driver) = driver {
                self.attach_failure_screenshot(&ctx, driver.as_ref()).await;
            }
        }

        let error = outcome.err().map(|e| e.to_string());
        let report = tree.report(name, status, error.clone(), ctx.sink_errors());
        let duration_ms = start.elapsed().as_millis() as u64;

        match status {
            ScenarioStatus::Passed => info!("✓ {} ({} ms)", name, duration_ms),
            _ => error!(
                "✗ {} [{}] - {}",
                name,
                status,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
        if !report.sink_errors.is_empty() {
            warn!("{} reporting error(s) in '{}'", report.sink_errors.len(), name);
        }

        ScenarioResult {
            name: name.to_string(),
            status,
            duration_ms,
            error,
            data_file: None,
            report: Some(report),
        }
    }

    async fn attach_failure_screenshot(&self, ctx: &StepContext, driver: &dyn Driver) {
        match tokio::time::timeout(Duration::from_secs(10), driver.screenshot()).await {
            Ok(Ok(png)) => ctx.attachment("failure screenshot", png, "image/png"),
            Ok(Err(e)) => warn!("Failure screenshot not taken: {}", e),
            Err(_) => warn!("Failure screenshot timed out"),
        }
    }

    /// A scenario that could not start; carries an empty report
    pub fn setup_failure(&self, name: &str, error: &E2eError) -> ScenarioResult {
        let tree = ReportTree::new();
        let message = error.to_string();
        error!("✗ {} [setup failed] - {}", name, message);
        ScenarioResult {
            name: name.to_string(),
            status: ScenarioStatus::SetupFailed,
            duration_ms: 0,
            error: Some(message.clone()),
            data_file: None,
            report: Some(tree.report(name, ScenarioStatus::SetupFailed, Some(message), vec![])),
        }
    }

    /// Launch a browser session and run the search flow for one record
    pub async fn run_search_case(
        &self,
        factory: &dyn DriverFactory,
        case: &SearchCase,
    ) -> ScenarioResult {
        let driver = match factory.launch().await {
            Ok(driver) => driver,
            Err(e) if e.is_setup() => return self.setup_failure(&case.name, &e),
            Err(e) => {
                let message = e.to_string();
                return self
                    .run(&case.name, None, |_| async move { Err(E2eError::Playwright(message)) })
                    .await;
            }
        };

        let wait_timeout = Duration::from_millis(self.config.playwright.action_timeout_ms * 2);
        let page = SearchPage::new(
            driver.clone(),
            self.config.base_url.clone(),
            &self.config.selectors,
        )
        .with_wait_timeout(wait_timeout);
        let default_owner = self.config.default_owner.as_deref();

        let result = self
            .run(&case.name, Some(&driver), |ctx| async move {
                search_scenario(&ctx, &page, case, default_owner).await
            })
            .await;

        if let Err(e) = driver.close().await {
            warn!("Closing browser for '{}' failed: {}", case.name, e);
        }
        result
    }

    /// Run every selected record of the loaded data files.
    ///
    /// Up to `workers` scenarios run at once; results keep input order. A
    /// file that could not be read yields one setup-failed result, and each
    /// rejected record selected by `filter` yields its own.
    pub async fn run_search_suite(
        &self,
        factory: &dyn DriverFactory,
        files: Vec<DataFile>,
        filter: &CaseFilter,
    ) -> TestSuiteResult {
        let start = Instant::now();

        let mut jobs = Vec::new();
        for file in files {
            let parsed = match file.result {
                Ok(parsed) => parsed,
                Err(error) => {
                    let name = file_label(&file.path);
                    jobs.push(Job::Invalid {
                        name,
                        source: file.path,
                        error,
                    });
                    continue;
                }
            };

            jobs.extend(
                parsed
                    .cases
                    .into_iter()
                    .filter(|c| filter.matches(c))
                    .map(|case| Job::Run {
                        case,
                        source: file.path.clone(),
                    }),
            );
            for rejected in parsed.rejected {
                if !filter.matches_record(rejected.name.as_deref(), &rejected.tags) {
                    continue;
                }
                let name = rejected
                    .name
                    .unwrap_or_else(|| format!("{} #{}", file_label(&file.path), rejected.index));
                jobs.push(Job::Invalid {
                    name,
                    source: file.path.clone(),
                    error: rejected.error,
                });
            }
        }

        info!("Running {} scenario(s) with {} worker(s)...", jobs.len(), self.config.workers);

        let results: Vec<ScenarioResult> = stream::iter(jobs)
            .map(|job| async move {
                match job {
                    Job::Run { case, source } => {
                        let mut result = self.run_search_case(factory, &case).await;
                        result.data_file = Some(source);
                        result
                    }
                    Job::Invalid { name, source, error } => {
                        let mut result = self.setup_failure(&name, &error);
                        result.data_file = Some(source);
                        result
                    }
                }
            })
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let suite = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} broken, {} timed out, {} setup failed ({} ms)",
            suite.passed,
            suite.failed,
            suite.broken,
            suite.timed_out,
            suite.setup_failed,
            suite.duration_ms
        );
        suite
    }

    /// Write every scenario report plus a `test-results.json` summary
    pub fn write_results(&self, suite: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, suite)
    }
}

pub fn write_results(output_dir: &Path, suite: &TestSuiteResult) -> E2eResult<PathBuf> {
    let writer = ResultsWriter::new(output_dir)?;
    for result in &suite.results {
        if let Some(report) = &result.report {
            writer.write_scenario(report)?;
        }
    }

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(suite)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// The search scenario: metadata from the record, then search, read, verify
pub async fn search_scenario(
    ctx: &StepContext,
    page: &SearchPage,
    case: &SearchCase,
    default_owner: Option<&str>,
) -> E2eResult<()> {
    if let Some(owner) = case.owner.as_deref().or(default_owner) {
        ctx.owner(owner);
    }
    if let Some(description) = &case.description {
        ctx.description(description);
    }
    ctx.links(case.links.iter().map(Link::new));
    for issue in &case.issues {
        ctx.issue(&issue.id, &issue.url);
    }
    for tag in &case.tags {
        ctx.label("tag", tag);
    }
    ctx.parameter("query", &case.query);
    if let Some(min) = case.expected.min_results {
        ctx.parameter("min_results", min);
    }

    steps::perform_search(ctx, page, &case.query).await?;
    let results = steps::read_results(ctx, page, case.expected.read_limit).await?;
    steps::verify_results(ctx, page, &results, &case.expected).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(&Ok(())), ScenarioStatus::Passed);
        assert_eq!(
            classify(&Err(E2eError::AssertionFailed("x".into()))),
            ScenarioStatus::Failed
        );
        assert_eq!(
            classify(&Err(E2eError::ElementNotFound { selector: "#q".into() })),
            ScenarioStatus::Broken
        );
        assert_eq!(
            classify(&Err(E2eError::ScenarioTimeout { seconds: 1 })),
            ScenarioStatus::TimedOut
        );
        assert_eq!(
            classify(&Err(E2eError::DataLoad {
                path: "a.json".into(),
                reason: "bad".into(),
            })),
            ScenarioStatus::SetupFailed
        );
    }

    #[test]
    fn test_suite_counts() {
        let result = |status| ScenarioResult {
            name: "s".into(),
            status,
            duration_ms: 1,
            error: None,
            data_file: None,
            report: None,
        };
        let suite = TestSuiteResult::from_results(
            vec![
                result(ScenarioStatus::Passed),
                result(ScenarioStatus::Failed),
                result(ScenarioStatus::SetupFailed),
            ],
            3,
        );
        assert_eq!((suite.total, suite.passed, suite.failed, suite.setup_failed), (3, 1, 1, 1));
        assert!(!suite.success());
    }
}
