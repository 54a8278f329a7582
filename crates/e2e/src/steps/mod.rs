//! Reusable reporting steps built on page objects
//!
//! Each function opens a named step on the context it is given, calls into
//! the page layer and returns whatever the page returned. Errors pass
//! through unchanged after the step is marked failed.

pub mod search;

pub use search::{perform_search, read_results, verify_results};
