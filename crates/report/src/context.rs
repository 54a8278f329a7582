//! Step context: the value threaded down a scenario's call chain
//!
//! Every `step()` hands its body a child context pointing at the new step,
//! so nested steps and attachments are attributed to whatever context the
//! code was given. Nothing is looked up from thread-local or global state,
//! which keeps concurrently running scenarios independent.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info_span, warn, Instrument};

use crate::error::ReportError;
use crate::model::{Attachment, Link, StepHandle, StepOutcome};
use crate::sink::ReportSink;

#[derive(Clone)]
pub struct StepContext {
    scenario: Arc<ScenarioShared>,
    current: Option<Arc<ActiveStep>>,
}

struct ScenarioShared {
    name: String,
    sink: Arc<dyn ReportSink>,
    sink_errors: Mutex<Vec<String>>,
}

struct ActiveStep {
    handle: StepHandle,
    name: String,
    ended: AtomicBool,
}

impl ScenarioShared {
    fn report_error(&self, err: ReportError) {
        warn!(scenario = %self.name, "Reporting error: {}", err);
        self.sink_errors.lock().push(err.to_string());
    }
}

impl StepContext {
    /// Root context of a scenario; steps opened from it are top-level
    pub fn new(scenario_name: impl Into<String>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            scenario: Arc::new(ScenarioShared {
                name: scenario_name.into(),
                sink,
                sink_errors: Mutex::new(Vec::new()),
            }),
            current: None,
        }
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario.name
    }

    /// Name of the step this context belongs to, `None` at the scenario root
    pub fn current_step(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.name.as_str())
    }

    /// Reporting failures collected so far, oldest first
    pub fn sink_errors(&self) -> Vec<String> {
        self.scenario.sink_errors.lock().clone()
    }

    /// Run an async body as a named step.
    ///
    /// The step stays open across every suspension point of `body`. An `Err`
    /// marks the step failed and is returned to the caller untouched. If the
    /// returned future is dropped before completion the step is recorded as
    /// aborted.
    pub async fn step<T, E, F, Fut>(&self, name: impl Into<String>, body: F) -> Result<T, E>
    where
        F: FnOnce(StepContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let name = name.into();
        let (child, guard) = self.enter(&name);
        let span = info_span!("step", name = %name);

        let result = body(child).instrument(span).await;

        guard.finish(outcome_of(&result));
        result
    }

    /// Synchronous flavour of [`StepContext::step`]
    pub fn step_sync<T, E, F>(&self, name: impl Into<String>, body: F) -> Result<T, E>
    where
        F: FnOnce(&StepContext) -> Result<T, E>,
        E: fmt::Display,
    {
        let name = name.into();
        let (child, guard) = self.enter(&name);

        let result = info_span!("step", name = %name).in_scope(|| body(&child));

        guard.finish(outcome_of(&result));
        result
    }

    /// Record a completed step with no body
    pub fn log_step(&self, name: impl Into<String>) {
        let name = name.into();
        let (_child, guard) = self.enter(&name);
        guard.finish(StepOutcome::Completed);
    }

    /// Attach an artifact to the innermost active step, or to the scenario
    /// root when called outside any step
    pub fn attachment(
        &self,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        mime_type: &str,
    ) {
        let attachment = Attachment::new(name, content, mime_type);

        if let Some(step) = &self.current {
            if step.ended.load(Ordering::Acquire) {
                self.scenario.report_error(ReportError::StepClosed {
                    name: step.name.clone(),
                    what: format!("attachment '{}'", attachment.name),
                });
                return;
            }
        }

        debug!(
            attachment = %attachment.name,
            size = attachment.content.len(),
            "Attaching to {}",
            self.current_step().unwrap_or("scenario root")
        );

        let handle = self.current.as_ref().map(|s| s.handle);
        if let Err(e) = self.scenario.sink.attach(handle, &attachment) {
            self.scenario.report_error(e);
        }
    }

    pub fn links(&self, entries: impl IntoIterator<Item = Link>) {
        for link in entries {
            if let Err(e) = self.scenario.sink.add_link(&link) {
                self.scenario.report_error(e);
            }
        }
    }

    /// Set the scenario owner; a later call replaces an earlier one
    pub fn owner(&self, name: &str) {
        if let Err(e) = self.scenario.sink.set_owner(name) {
            self.scenario.report_error(e);
        }
    }

    pub fn issue(&self, id: &str, url: &str) {
        if let Err(e) = self.scenario.sink.add_issue_ref(id, url) {
            self.scenario.report_error(e);
        }
    }

    pub fn label(&self, name: &str, value: &str) {
        if let Err(e) = self.scenario.sink.add_label(name, value) {
            self.scenario.report_error(e);
        }
    }

    pub fn description(&self, text: &str) {
        if let Err(e) = self.scenario.sink.set_description(text) {
            self.scenario.report_error(e);
        }
    }

    pub fn parameter(&self, name: &str, value: impl fmt::Display) {
        if let Err(e) = self.scenario.sink.add_parameter(name, &value.to_string()) {
            self.scenario.report_error(e);
        }
    }

    /// Open a step under this context. On any reporting problem the body
    /// still runs, attributed to this context's step.
    fn enter(&self, name: &str) -> (StepContext, StepGuard) {
        let unreported = |ctx: &StepContext| {
            let guard = StepGuard {
                scenario: ctx.scenario.clone(),
                step: None,
            };
            (ctx.clone(), guard)
        };

        if name.trim().is_empty() {
            self.scenario.report_error(ReportError::EmptyStepName);
            return unreported(self);
        }

        if let Some(parent) = &self.current {
            if parent.ended.load(Ordering::Acquire) {
                self.scenario.report_error(ReportError::StepClosed {
                    name: parent.name.clone(),
                    what: format!("step '{}'", name),
                });
                return unreported(self);
            }
        }

        let parent = self.current.as_ref().map(|s| s.handle);
        match self.scenario.sink.begin_step(name, parent) {
            Ok(handle) => {
                debug!(step = %name, %handle, "Step started");
                let step = Arc::new(ActiveStep {
                    handle,
                    name: name.to_string(),
                    ended: AtomicBool::new(false),
                });
                let child = StepContext {
                    scenario: self.scenario.clone(),
                    current: Some(step.clone()),
                };
                let guard = StepGuard {
                    scenario: self.scenario.clone(),
                    step: Some(step),
                };
                (child, guard)
            }
            Err(e) => {
                self.scenario.report_error(e);
                unreported(self)
            }
        }
    }
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("scenario", &self.scenario.name)
            .field("step", &self.current_step())
            .finish()
    }
}

fn outcome_of<T, E: fmt::Display>(result: &Result<T, E>) -> StepOutcome {
    match result {
        Ok(_) => StepOutcome::Completed,
        Err(e) => StepOutcome::Failed(e.to_string()),
    }
}

/// Ends its step exactly once: explicitly via `finish`, otherwise as
/// aborted when dropped.
struct StepGuard {
    scenario: Arc<ScenarioShared>,
    step: Option<Arc<ActiveStep>>,
}

impl StepGuard {
    fn finish(mut self, outcome: StepOutcome) {
        if let Some(step) = self.step.take() {
            if step.ended.swap(true, Ordering::AcqRel) {
                return;
            }
            debug!(step = %step.name, status = ?outcome.status(), "Step ended");
            if let Err(e) = self.scenario.sink.end_step(step.handle, outcome) {
                self.scenario.report_error(e);
            }
        }
    }
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        let Some(step) = self.step.take() else {
            return;
        };
        if step.ended.swap(true, Ordering::AcqRel) {
            return;
        }

        let reason = if std::thread::panicking() {
            "step body panicked"
        } else {
            "step dropped before completion"
        };
        debug!(step = %step.name, "Step aborted: {}", reason);

        // A dropped chain unwinds outside-in as often as inside-out; the
        // sink may already have closed this step from its parent.
        match self
            .scenario
            .sink
            .end_step(step.handle, StepOutcome::Aborted(reason.to_string()))
        {
            Ok(()) => {}
            Err(ReportError::StepAlreadyEnded { .. }) | Err(ReportError::OpenChildren { .. }) => {}
            Err(e) => self.scenario.report_error(e),
        }
    }
}
