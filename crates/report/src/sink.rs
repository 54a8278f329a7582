//! The reporting sink seam
//!
//! The orchestration layer never formats output; it only emits these
//! events. A sink instance belongs to exactly one scenario.

use crate::error::ReportResult;
use crate::model::{Attachment, Link, StepHandle, StepOutcome};

pub trait ReportSink: Send + Sync {
    /// Open a step under `parent` (or the scenario root)
    fn begin_step(&self, name: &str, parent: Option<StepHandle>) -> ReportResult<StepHandle>;

    fn end_step(&self, handle: StepHandle, outcome: StepOutcome) -> ReportResult<()>;

    /// Attach to `handle`, or to the scenario root when `None`
    fn attach(&self, handle: Option<StepHandle>, attachment: &Attachment) -> ReportResult<()>;

    fn add_link(&self, link: &Link) -> ReportResult<()>;

    fn set_owner(&self, name: &str) -> ReportResult<()>;

    fn add_issue_ref(&self, id: &str, url: &str) -> ReportResult<()> {
        self.add_link(&Link::issue(id, url))
    }

    fn add_label(&self, _name: &str, _value: &str) -> ReportResult<()> {
        Ok(())
    }

    fn set_description(&self, _text: &str) -> ReportResult<()> {
        Ok(())
    }

    fn add_parameter(&self, _name: &str, _value: &str) -> ReportResult<()> {
        Ok(())
    }
}
