//! In-memory report tree, one per scenario

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};
use crate::model::{
    Attachment, AttachmentRecord, Label, Link, Parameter, ReportEntry, ScenarioMetadata,
    ScenarioReport, ScenarioStatus, StepHandle, StepNode, StepOutcome, StepStatus,
};
use crate::sink::ReportSink;

/// Sink that records every event into an ordered tree.
///
/// Steps live in an arena indexed by their handle; each node keeps one
/// ordered child list so sibling steps and attachments keep invocation order.
pub struct ReportTree {
    uuid: Uuid,
    started_at: DateTime<Utc>,
    state: Mutex<TreeState>,
}

#[derive(Default)]
struct TreeState {
    steps: Vec<StepRecord>,
    root: Vec<Child>,
    metadata: ScenarioMetadata,
}

struct StepRecord {
    name: String,
    status: StepStatus,
    status_message: Option<String>,
    start: DateTime<Utc>,
    stop: Option<DateTime<Utc>>,
    children: Vec<Child>,
}

enum Child {
    Step(usize),
    Attachment(AttachmentRecord),
}

impl ReportTree {
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            started_at: Utc::now(),
            state: Mutex::new(TreeState::default()),
        }
    }

    /// Number of steps still active
    pub fn active_steps(&self) -> usize {
        let state = self.state.lock();
        state.steps.iter().filter(|s| s.status == StepStatus::Active).count()
    }

    /// Mark every step that is still active as aborted
    pub fn abort_active(&self, reason: &str) -> usize {
        let mut state = self.state.lock();
        let now = Utc::now();
        let mut aborted = 0;
        // Children always have a higher index than their parent, so walking
        // backwards closes the innermost steps first.
        for step in state.steps.iter_mut().rev() {
            if step.status == StepStatus::Active {
                step.status = StepStatus::Aborted;
                step.status_message = Some(reason.to_string());
                step.stop = Some(now);
                aborted += 1;
            }
        }
        aborted
    }

    /// Close the tree and produce its serializable snapshot
    pub fn report(
        &self,
        name: &str,
        status: ScenarioStatus,
        status_message: Option<String>,
        sink_errors: Vec<String>,
    ) -> ScenarioReport {
        let leftover = self.abort_active("scenario finished while step was active");
        if leftover > 0 {
            debug!("Aborted {} step(s) still active at end of '{}'", leftover, name);
        }

        let state = self.state.lock();
        ScenarioReport {
            uuid: self.uuid,
            name: name.to_string(),
            status,
            status_message,
            start: self.started_at,
            stop: Utc::now(),
            metadata: state.metadata.clone(),
            children: state.entries(&state.root),
            sink_errors,
        }
    }
}

impl Default for ReportTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeState {
    fn record(&self, handle: StepHandle) -> ReportResult<&StepRecord> {
        self.steps
            .get(handle.0 as usize)
            .ok_or(ReportError::UnknownStep(handle))
    }

    fn entries(&self, children: &[Child]) -> Vec<ReportEntry> {
        children
            .iter()
            .map(|child| match child {
                Child::Step(idx) => ReportEntry::Step(self.node(*idx)),
                Child::Attachment(a) => ReportEntry::Attachment(a.clone()),
            })
            .collect()
    }

    fn node(&self, idx: usize) -> StepNode {
        let step = &self.steps[idx];
        StepNode {
            name: step.name.clone(),
            status: step.status,
            status_message: step.status_message.clone(),
            start: step.start,
            stop: step.stop,
            children: self.entries(&step.children),
        }
    }

    /// Active descendants of `idx`, deepest first
    fn active_descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for child in &self.steps[idx].children {
            if let Child::Step(c) = child {
                out.extend(self.active_descendants(*c));
                if self.steps[*c].status == StepStatus::Active {
                    out.push(*c);
                }
            }
        }
        out
    }
}

impl ReportSink for ReportTree {
    fn begin_step(&self, name: &str, parent: Option<StepHandle>) -> ReportResult<StepHandle> {
        if name.trim().is_empty() {
            return Err(ReportError::EmptyStepName);
        }

        let mut state = self.state.lock();
        let parent_idx = match parent {
            Some(handle) => {
                let record = state.record(handle)?;
                if record.status.is_terminal() {
                    return Err(ReportError::StepClosed {
                        name: record.name.clone(),
                        what: format!("step '{}'", name),
                    });
                }
                Some(handle.0 as usize)
            }
            None => None,
        };

        let idx = state.steps.len();
        state.steps.push(StepRecord {
            name: name.to_string(),
            status: StepStatus::Active,
            status_message: None,
            start: Utc::now(),
            stop: None,
            children: Vec::new(),
        });

        match parent_idx {
            Some(p) => state.steps[p].children.push(Child::Step(idx)),
            None => state.root.push(Child::Step(idx)),
        }

        Ok(StepHandle(idx as u64))
    }

    fn end_step(&self, handle: StepHandle, outcome: StepOutcome) -> ReportResult<()> {
        let mut state = self.state.lock();
        let record = state.record(handle)?;
        if record.status.is_terminal() {
            return Err(ReportError::StepAlreadyEnded { name: record.name.clone() });
        }

        let idx = handle.0 as usize;
        let now = Utc::now();
        let open = state.active_descendants(idx);
        let parent_name = state.steps[idx].name.clone();
        for child in &open {
            let step = &mut state.steps[*child];
            step.status = StepStatus::Aborted;
            step.status_message = Some(format!("parent step '{}' ended first", parent_name));
            step.stop = Some(now);
        }

        let step = &mut state.steps[idx];
        step.status = outcome.status();
        step.status_message = outcome.message().map(String::from);
        step.stop = Some(now);

        if open.is_empty() {
            Ok(())
        } else {
            Err(ReportError::OpenChildren {
                name: parent_name,
                count: open.len(),
            })
        }
    }

    fn attach(&self, handle: Option<StepHandle>, attachment: &Attachment) -> ReportResult<()> {
        let mut state = self.state.lock();
        let record = AttachmentRecord::from(attachment);
        match handle {
            Some(handle) => {
                let step = state.record(handle)?;
                if step.status.is_terminal() {
                    return Err(ReportError::StepClosed {
                        name: step.name.clone(),
                        what: format!("attachment '{}'", attachment.name),
                    });
                }
                state.steps[handle.0 as usize].children.push(Child::Attachment(record));
            }
            None => state.root.push(Child::Attachment(record)),
        }
        Ok(())
    }

    fn add_link(&self, link: &Link) -> ReportResult<()> {
        self.state.lock().metadata.links.push(link.clone());
        Ok(())
    }

    fn set_owner(&self, name: &str) -> ReportResult<()> {
        self.state.lock().metadata.owner = Some(name.to_string());
        Ok(())
    }

    fn add_label(&self, name: &str, value: &str) -> ReportResult<()> {
        self.state.lock().metadata.labels.push(Label {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn set_description(&self, text: &str) -> ReportResult<()> {
        self.state.lock().metadata.description = Some(text.to_string());
        Ok(())
    }

    fn add_parameter(&self, name: &str, value: &str) -> ReportResult<()> {
        self.state.lock().metadata.parameters.push(Parameter {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_keep_invocation_order() {
        let tree = ReportTree::new();
        let a = tree.begin_step("a", None).unwrap();
        tree.attach(Some(a), &Attachment::new("first", "1", "text/plain")).unwrap();
        let b = tree.begin_step("b", Some(a)).unwrap();
        tree.end_step(b, StepOutcome::Completed).unwrap();
        tree.attach(Some(a), &Attachment::new("last", "2", "text/plain")).unwrap();
        tree.end_step(a, StepOutcome::Completed).unwrap();

        let report = tree.report("order", ScenarioStatus::Passed, None, vec![]);
        let step = report.steps().next().unwrap();
        let kinds: Vec<String> = step
            .children
            .iter()
            .map(|e| match e {
                ReportEntry::Step(s) => format!("step:{}", s.name),
                ReportEntry::Attachment(a) => format!("attachment:{}", a.name),
            })
            .collect();
        assert_eq!(kinds, vec!["attachment:first", "step:b", "attachment:last"]);
    }

    #[test]
    fn test_end_twice_is_rejected() {
        let tree = ReportTree::new();
        let a = tree.begin_step("a", None).unwrap();
        tree.end_step(a, StepOutcome::Failed("boom".into())).unwrap();
        let err = tree.end_step(a, StepOutcome::Completed).unwrap_err();
        assert!(matches!(err, ReportError::StepAlreadyEnded { .. }));

        let report = tree.report("twice", ScenarioStatus::Failed, None, vec![]);
        assert_eq!(report.steps().next().unwrap().status, StepStatus::Failed);
    }

    #[test]
    fn test_parent_end_aborts_open_children() {
        let tree = ReportTree::new();
        let parent = tree.begin_step("parent", None).unwrap();
        let child = tree.begin_step("child", Some(parent)).unwrap();
        let grandchild = tree.begin_step("grandchild", Some(child)).unwrap();

        let err = tree.end_step(parent, StepOutcome::Completed).unwrap_err();
        assert!(matches!(err, ReportError::OpenChildren { count: 2, .. }));
        assert_eq!(tree.active_steps(), 0);

        let err = tree.end_step(grandchild, StepOutcome::Completed).unwrap_err();
        assert!(matches!(err, ReportError::StepAlreadyEnded { .. }));

        let report = tree.report("leak", ScenarioStatus::Broken, None, vec![]);
        let child = report.find_step("child").unwrap();
        assert_eq!(child.status, StepStatus::Aborted);
    }

    #[test]
    fn test_closed_parent_rejects_new_children() {
        let tree = ReportTree::new();
        let a = tree.begin_step("a", None).unwrap();
        tree.end_step(a, StepOutcome::Completed).unwrap();

        assert!(matches!(
            tree.begin_step("late", Some(a)),
            Err(ReportError::StepClosed { .. })
        ));
        assert!(matches!(
            tree.attach(Some(a), &Attachment::new("late", "", "text/plain")),
            Err(ReportError::StepClosed { .. })
        ));
    }

    #[test]
    fn test_unknown_handle() {
        let tree = ReportTree::new();
        assert!(matches!(
            tree.end_step(StepHandle(42), StepOutcome::Completed),
            Err(ReportError::UnknownStep(StepHandle(42)))
        ));
    }

    #[test]
    fn test_report_aborts_leftover_steps() {
        let tree = ReportTree::new();
        tree.begin_step("dangling", None).unwrap();
        let report = tree.report("leftover", ScenarioStatus::TimedOut, None, vec![]);
        assert_eq!(report.steps().next().unwrap().status, StepStatus::Aborted);
    }
}
