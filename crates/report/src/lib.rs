//! Stepwright Report
//!
//! Named, nestable reporting steps for browser E2E scenarios.
//!
//! A scenario owns one [`ReportSink`] (usually a [`ReportTree`]). Test code
//! receives a [`StepContext`] and threads it down the call chain: every
//! `step()` call hands its body a child context, so attribution of nested
//! steps and attachments follows the value, not hidden global state.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StepContext (per logical call chain)                    │
//! │    ├── step(name, |ctx| async { .. }) -> Result<T, E>    │
//! │    ├── step_sync(name, |ctx| ..)      -> Result<T, E>    │
//! │    ├── attachment(name, bytes, mime)                     │
//! │    └── links / owner / issue / label / parameter         │
//! ├──────────────────────────────────────────────────────────┤
//! │  ReportSink (trait)                                      │
//! │    ├── ReportTree  -> ScenarioReport (serde)             │
//! │    └── ResultsWriter writes <uuid>-result.json           │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod model;
pub mod sink;
pub mod tree;
pub mod writer;

pub use context::StepContext;
pub use error::{ReportError, ReportResult};
pub use model::{
    Attachment, AttachmentRecord, Link, LinkKind, ReportEntry, ScenarioMetadata, ScenarioReport,
    ScenarioStatus, StepHandle, StepNode, StepOutcome, StepStatus,
};
pub use sink::ReportSink;
pub use tree::ReportTree;
pub use writer::ResultsWriter;
