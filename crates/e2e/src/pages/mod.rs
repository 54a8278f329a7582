//! Page objects: one per application route

pub mod search;

pub use search::{SearchPage, SearchSelectors};
