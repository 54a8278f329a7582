//! Search input form

use std::sync::Arc;
use std::time::Duration;

use crate::driver::{Driver, WaitState};
use crate::error::E2eResult;
use crate::locator::{Scope, Selector};

pub struct SearchForm {
    driver: Arc<dyn Driver>,
    input: Selector,
    submit: Selector,
}

impl SearchForm {
    pub fn new(driver: Arc<dyn Driver>, scope: Scope, input: &str, submit: &str) -> Self {
        Self {
            driver,
            input: scope.locate(input),
            submit: scope.locate(submit),
        }
    }

    pub fn input(&self) -> &Selector {
        &self.input
    }

    pub async fn wait_until_ready(&self, timeout: Duration) -> E2eResult<()> {
        self.driver.wait_for(&self.input, WaitState::Visible, timeout).await
    }

    pub async fn fill_query(&self, query: &str) -> E2eResult<()> {
        self.driver.fill(&self.input, query).await
    }

    pub async fn submit(&self) -> E2eResult<()> {
        self.driver.click(&self.submit).await
    }

    /// Submit with the keyboard instead of the button
    pub async fn press_enter(&self) -> E2eResult<()> {
        self.driver.press(&self.input, "Enter").await
    }

    pub async fn query_value(&self) -> E2eResult<Option<String>> {
        self.driver.attribute(&self.input, "value").await
    }
}
