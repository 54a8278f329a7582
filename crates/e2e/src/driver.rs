//! Browser driver seam
//!
//! Components and pages only talk to a [`Driver`]. Errors coming out of it
//! (`ElementNotFound`, `Timeout`, `Navigation`, ...) travel up through the
//! component, page and step layers unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::E2eResult;
use crate::locator::Selector;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// One browser page session
#[async_trait]
pub trait Driver: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn click(&self, selector: &Selector) -> E2eResult<()>;

    async fn fill(&self, selector: &Selector, value: &str) -> E2eResult<()>;

    async fn press(&self, selector: &Selector, key: &str) -> E2eResult<()>;

    async fn wait_for(
        &self,
        selector: &Selector,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()>;

    async fn text_content(&self, selector: &Selector) -> E2eResult<String>;

    /// Text of every element matching `selector`, in document order
    async fn all_text_contents(&self, selector: &Selector) -> E2eResult<Vec<String>>;

    async fn attribute(&self, selector: &Selector, name: &str) -> E2eResult<Option<String>>;

    async fn count(&self, selector: &Selector) -> E2eResult<usize>;

    /// PNG bytes of the current viewport
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;

    async fn current_url(&self) -> E2eResult<String>;

    async fn close(&self) -> E2eResult<()>;
}

/// Launches an independent browser session per scenario
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>>;
}
