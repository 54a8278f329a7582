//! Report data model: step handles, outcomes, attachments, metadata and the
//! serializable scenario report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Opaque handle to a step, allocated by the sink in `begin_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepHandle(pub u64);

impl fmt::Display for StepHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The body returned an error; carries its message
    Failed(String),
    /// The step was dropped while still active (timeout, panic, leaked child)
    Aborted(String),
}

impl StepOutcome {
    pub fn status(&self) -> StepStatus {
        match self {
            StepOutcome::Completed => StepStatus::Completed,
            StepOutcome::Failed(_) => StepStatus::Failed,
            StepOutcome::Aborted(_) => StepStatus::Aborted,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            StepOutcome::Completed => None,
            StepOutcome::Failed(msg) | StepOutcome::Aborted(msg) => Some(msg),
        }
    }
}

/// Lifecycle state of a recorded step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Active,
    Completed,
    Failed,
    Aborted,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Active)
    }
}

/// Final classification of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    /// An expectation did not hold
    Failed,
    /// The scenario errored outside of an assertion (driver, navigation, ...)
    Broken,
    TimedOut,
    /// The scenario could not start, e.g. its data record failed to load
    SetupFailed,
}

impl ScenarioStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ScenarioStatus::Passed)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed => "failed",
            ScenarioStatus::Broken => "broken",
            ScenarioStatus::TimedOut => "timed out",
            ScenarioStatus::SetupFailed => "setup failed",
        };
        f.write_str(s)
    }
}

/// An artifact handed to the sink
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// An attachment as recorded in the report tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub sha256: String,

    /// File name of the written content, set by the results writer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip)]
    pub content: Vec<u8>,
}

impl From<&Attachment> for AttachmentRecord {
    fn from(a: &Attachment) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&a.content);
        Self {
            name: a.name.clone(),
            mime_type: a.mime_type.clone(),
            size: a.content.len(),
            sha256: hex::encode(hasher.finalize()),
            source: None,
            content: a.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Link,
    Issue,
}

/// A scenario-level link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    pub kind: LinkKind,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            kind: LinkKind::Link,
        }
    }

    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: url.into(),
            kind: LinkKind::Link,
        }
    }

    pub fn issue(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(id.into()),
            url: url.into(),
            kind: LinkKind::Issue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Facts attached to the scenario as a whole, never to a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default)]
    pub labels: Vec<Label>,

    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl ScenarioMetadata {
    pub fn issues(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.kind == LinkKind::Issue)
    }
}

/// One ordered child of a step or of the scenario root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Step(StepNode),
    Attachment(AttachmentRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepNode {
    pub name: String,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    pub start: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<Utc>>,

    #[serde(default)]
    pub children: Vec<ReportEntry>,
}

impl StepNode {
    pub fn steps(&self) -> impl Iterator<Item = &StepNode> {
        child_steps(&self.children)
    }

    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentRecord> {
        child_attachments(&self.children)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps().map(|s| s.name.as_str()).collect()
    }
}

/// Serializable snapshot of one scenario's report tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub uuid: Uuid,
    pub name: String,
    pub status: ScenarioStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,

    #[serde(default)]
    pub metadata: ScenarioMetadata,

    #[serde(default)]
    pub children: Vec<ReportEntry>,

    /// Reporting failures seen while the scenario ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sink_errors: Vec<String>,
}

impl ScenarioReport {
    pub fn steps(&self) -> impl Iterator<Item = &StepNode> {
        child_steps(&self.children)
    }

    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentRecord> {
        child_attachments(&self.children)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps().map(|s| s.name.as_str()).collect()
    }

    /// Depth-first search for the first step with the given name
    pub fn find_step(&self, name: &str) -> Option<&StepNode> {
        fn walk<'a>(entries: &'a [ReportEntry], name: &str) -> Option<&'a StepNode> {
            for step in child_steps(entries) {
                if step.name == name {
                    return Some(step);
                }
                if let Some(found) = walk(&step.children, name) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.children, name)
    }
}

fn child_steps(entries: &[ReportEntry]) -> impl Iterator<Item = &StepNode> {
    entries.iter().filter_map(|e| match e {
        ReportEntry::Step(s) => Some(s),
        ReportEntry::Attachment(_) => None,
    })
}

fn child_attachments(entries: &[ReportEntry]) -> impl Iterator<Item = &AttachmentRecord> {
    entries.iter().filter_map(|e| match e {
        ReportEntry::Attachment(a) => Some(a),
        ReportEntry::Step(_) => None,
    })
}
