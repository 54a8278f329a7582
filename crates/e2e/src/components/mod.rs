//! Reusable UI element wrappers
//!
//! A component holds a driver and a [`Scope`](crate::locator::Scope) fixed
//! at construction. It only delegates to the driver; errors are returned
//! exactly as the driver produced them.

pub mod result_list;
pub mod search_form;

pub use result_list::{ResultItem, ResultList, SearchResult};
pub use search_form::SearchForm;
