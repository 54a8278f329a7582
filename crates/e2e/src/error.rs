//! Error types for E2E testing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm i -D playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Test data error in {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Scenario timed out after {seconds}s")]
    ScenarioTimeout { seconds: u64 },

    #[error("Target {url} unreachable after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Report error: {0}")]
    Report(#[from] stepwright_report::ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn is_assertion(&self) -> bool {
        matches!(self, E2eError::AssertionFailed(_))
    }

    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            E2eError::DataLoad { .. } | E2eError::Config(_) | E2eError::PlaywrightNotFound
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
