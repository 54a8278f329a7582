//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};
use crate::pages::SearchSelectors;
use crate::playwright::PlaywrightConfig;

/// Runner configuration, usually read from `stepwright.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// URL of the application under test, handed to page objects
    pub base_url: String,

    /// Directory holding the JSON/YAML test data files
    pub data_dir: PathBuf,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Scenarios run concurrently, each with its own browser session
    pub workers: usize,

    /// Hard limit for one scenario; in-flight steps are marked aborted
    pub scenario_timeout_secs: u64,

    /// Attach a screenshot to scenarios that did not pass
    pub screenshot_on_failure: bool,

    /// Owner recorded for cases that do not name one
    pub default_owner: Option<String>,

    pub preflight: PreflightConfig,
    pub playwright: PlaywrightConfig,
    pub selectors: SearchSelectors,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: "https://duckduckgo.com/".to_string(),
            data_dir: PathBuf::from("tests/data"),
            output_dir: PathBuf::from("test-results"),
            workers: 1,
            scenario_timeout_secs: 60,
            screenshot_on_failure: true,
            default_owner: None,
            preflight: PreflightConfig::default(),
            playwright: PlaywrightConfig::default(),
            selectors: SearchSelectors::default(),
        }
    }
}

/// Reachability probe of the application before any browser starts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
        }
    }
}

impl RunConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> E2eResult<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| E2eError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".to_string()));
        }
        if self.scenario_timeout_secs == 0 {
            return Err(E2eError::Config("scenario_timeout_secs must be at least 1".to_string()));
        }
        if self.playwright.action_timeout_ms == 0 {
            return Err(E2eError::Config(
                "playwright.action_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::Browser;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.workers, 1);
        assert!(config.screenshot_on_failure);
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepwright.toml");
        std::fs::write(
            &path,
            r##"
base_url = "http://127.0.0.1:8080/"
workers = 4

[playwright]
browser = "firefox"
headless = false

[selectors]
input = "#search"
"##,
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/");
        assert_eq!(config.workers, 4);
        assert_eq!(config.playwright.browser, Browser::Firefox);
        assert!(!config.playwright.headless);
        assert_eq!(config.playwright.viewport_width, 1280);
        assert_eq!(config.selectors.input, "#search");
        assert_eq!(config.selectors.submit, SearchSelectors::default().submit);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/stepwright.toml");
        let config = RunConfig {
            workers: 3,
            default_owner: Some("qa".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded.workers, 3);
        assert_eq!(loaded.default_owner.as_deref(), Some("qa"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = RunConfig {
            base_url: "ftp://x".to_string(),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let no_workers = RunConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(no_workers.validate(), Err(E2eError::Config(_))));
    }
}
