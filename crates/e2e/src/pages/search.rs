//! Search page: query form plus result list

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::components::result_list::ItemSelectors;
use crate::components::{ResultList, SearchForm, SearchResult};
use crate::driver::Driver;
use crate::error::E2eResult;
use crate::locator::{Scope, Selector};

/// Selectors the search page is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSelectors {
    /// Root of the search form; `None` locates the form fields page-wide
    pub form: Option<String>,
    pub input: String,
    pub submit: String,

    /// Root of the result list; `None` locates result items page-wide
    pub results: Option<String>,
    pub result_item: String,
    pub result_title: String,
    pub result_link: String,
    pub result_snippet: String,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            form: Some("form[role=\"search\"]".to_string()),
            input: "input[name=\"q\"]".to_string(),
            submit: "button[type=\"submit\"]".to_string(),
            results: None,
            result_item: "article[data-testid=\"result\"]".to_string(),
            result_title: "[data-testid=\"result-title-a\"]".to_string(),
            result_link: "[data-testid=\"result-title-a\"]".to_string(),
            result_snippet: "[data-result=\"snippet\"]".to_string(),
        }
    }
}

pub struct SearchPage {
    driver: Arc<dyn Driver>,
    base_url: String,
    wait_timeout: Duration,
    form: SearchForm,
    results: ResultList,
}

impl SearchPage {
    pub fn new(
        driver: Arc<dyn Driver>,
        base_url: impl Into<String>,
        selectors: &SearchSelectors,
    ) -> Self {
        let scope_of = |root: &Option<String>| match root {
            Some(root) => Scope::within(Selector::new(root.as_str())),
            None => Scope::page(),
        };

        let form = SearchForm::new(
            driver.clone(),
            scope_of(&selectors.form),
            &selectors.input,
            &selectors.submit,
        );
        let results = ResultList::new(
            driver.clone(),
            scope_of(&selectors.results),
            &selectors.result_item,
            ItemSelectors {
                title: selectors.result_title.clone(),
                link: selectors.result_link.clone(),
                snippet: selectors.result_snippet.clone(),
            },
        );

        Self {
            driver,
            base_url: base_url.into(),
            wait_timeout: Duration::from_secs(10),
            form,
            results,
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn form(&self) -> &SearchForm {
        &self.form
    }

    pub fn result_list(&self) -> &ResultList {
        &self.results
    }

    /// Navigate to the page and wait for the search input
    pub async fn open(&self) -> E2eResult<()> {
        debug!("Opening {}", self.base_url);
        self.driver.goto(&self.base_url).await?;
        self.form.wait_until_ready(self.wait_timeout).await
    }

    pub async fn search(&self, query: &str) -> E2eResult<()> {
        self.form.fill_query(query).await?;
        self.form.submit().await
    }

    pub async fn wait_for_results(&self) -> E2eResult<()> {
        self.results.wait_until_visible(self.wait_timeout).await
    }

    /// Read at most `limit` results currently shown
    pub async fn results(&self, limit: usize) -> E2eResult<Vec<SearchResult>> {
        self.results.read(limit).await
    }

    pub async fn current_url(&self) -> E2eResult<String> {
        self.driver.current_url().await
    }

    pub async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        self.driver.screenshot().await
    }
}
