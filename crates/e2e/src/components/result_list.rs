//! Search result list and its items

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::driver::{Driver, WaitState};
use crate::error::E2eResult;
use crate::locator::{Scope, Selector};

/// Plain values read from one result item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

/// Selectors of one result item, relative to the item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSelectors {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

pub struct ResultList {
    driver: Arc<dyn Driver>,
    items: Selector,
    item_selectors: ItemSelectors,
}

impl ResultList {
    pub fn new(
        driver: Arc<dyn Driver>,
        scope: Scope,
        item: &str,
        item_selectors: ItemSelectors,
    ) -> Self {
        Self {
            driver,
            items: scope.locate(item),
            item_selectors,
        }
    }

    pub async fn wait_until_visible(&self, timeout: Duration) -> E2eResult<()> {
        self.driver.wait_for(&self.items, WaitState::Visible, timeout).await
    }

    pub async fn count(&self) -> E2eResult<usize> {
        self.driver.count(&self.items).await
    }

    /// Titles of all items in one round trip
    pub async fn titles(&self) -> E2eResult<Vec<String>> {
        let titles = self.items.child(&self.item_selectors.title);
        let texts = self.driver.all_text_contents(&titles).await?;
        Ok(texts.into_iter().map(|t| t.trim().to_string()).collect())
    }

    pub fn item(&self, index: usize) -> ResultItem {
        ResultItem {
            driver: self.driver.clone(),
            scope: Scope::within(self.items.nth(index)),
            selectors: self.item_selectors.clone(),
        }
    }

    /// Read up to `limit` items
    pub async fn read(&self, limit: usize) -> E2eResult<Vec<SearchResult>> {
        let count = self.count().await?.min(limit);
        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            results.push(self.item(index).read().await?);
        }
        Ok(results)
    }
}

pub struct ResultItem {
    driver: Arc<dyn Driver>,
    scope: Scope,
    selectors: ItemSelectors,
}

impl ResultItem {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub async fn title(&self) -> E2eResult<String> {
        let text = self.driver.text_content(&self.scope.locate(&self.selectors.title)).await?;
        Ok(text.trim().to_string())
    }

    pub async fn url(&self) -> E2eResult<Option<String>> {
        self.driver
            .attribute(&self.scope.locate(&self.selectors.link), "href")
            .await
    }

    /// Snippet text; `None` when the item has none
    pub async fn snippet(&self) -> E2eResult<Option<String>> {
        let selector = self.scope.locate(&self.selectors.snippet);
        if self.driver.count(&selector).await? == 0 {
            return Ok(None);
        }
        let text = self.driver.text_content(&selector).await?;
        Ok(Some(text.trim().to_string()))
    }

    pub async fn read(&self) -> E2eResult<SearchResult> {
        Ok(SearchResult {
            title: self.title().await?,
            url: self.url().await?,
            snippet: self.snippet().await?,
        })
    }
}
