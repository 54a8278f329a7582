//! Stepwright E2E
//!
//! Page objects and reusable reporting steps on top of a browser driver,
//! plus a runner that turns data records into reported scenarios:
//! - Drives a browser through a long-lived Playwright bridge process
//! - Scopes components to a root selector fixed at construction
//! - Loads typed test records from JSON or YAML
//! - Runs each record as a scenario with its own step tree
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ScenarioRunner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  data::load_dir() -> [DataFile { path, cases, rejected }]   │
//! │  run_search_suite(factory, files, filter)                   │
//! │    └── per case: launch() -> Arc<dyn Driver>                │
//! │          └── run(name, body) -> ScenarioResult              │
//! │                ├── ReportTree + StepContext                 │
//! │                ├── timeout -> TimedOut, aborted steps       │
//! │                └── screenshot attached when not passed      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  steps:      perform_search / read_results / verify_results │
//! │  pages:      SearchPage                                     │
//! │  components: SearchForm, ResultList, ResultItem             │
//! │  driver:     Driver trait <- PlaywrightDriver (node bridge) │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod components;
pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod locator;
pub mod pages;
pub mod playwright;
pub mod preflight;
pub mod scenario;
pub mod steps;

pub use config::RunConfig;
pub use data::{DataFile, ParsedCases, RejectedRecord, SearchCase};
pub use driver::{Driver, DriverFactory, WaitState};
pub use error::{E2eError, E2eResult};
pub use locator::{Scope, Selector};
pub use pages::SearchPage;
pub use playwright::{Browser, PlaywrightConfig, PlaywrightDriver};
pub use scenario::{CaseFilter, ScenarioResult, ScenarioRunner, TestSuiteResult};
