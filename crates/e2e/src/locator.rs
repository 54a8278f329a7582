//! Selectors and component scoping

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Playwright selector string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(String);

impl Selector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chain `inner` below this selector (`self >> inner`)
    pub fn child(&self, inner: &str) -> Selector {
        Selector(format!("{} >> {}", self.0, inner))
    }

    /// The n-th (zero based) match of this selector
    pub fn nth(&self, index: usize) -> Selector {
        Selector(format!("{} >> nth={}", self.0, index))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::new(s)
    }
}

/// Optional root a component is scoped to.
///
/// Resolved once when the component is built and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    root: Option<Selector>,
}

impl Scope {
    pub fn page() -> Self {
        Self { root: None }
    }

    pub fn within(root: Selector) -> Self {
        Self { root: Some(root) }
    }

    pub fn root(&self) -> Option<&Selector> {
        self.root.as_ref()
    }

    pub fn locate(&self, css: &str) -> Selector {
        match &self.root {
            Some(root) => root.child(css),
            None => Selector::new(css),
        }
    }

    /// Scope to `css` inside this scope
    pub fn nest(&self, css: &str) -> Scope {
        Scope::within(self.locate(css))
    }
}
