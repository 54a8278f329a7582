//! Step tree behaviour as seen through the public `StepContext` API

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use stepwright_report::{
    Attachment, Link, LinkKind, ReportError, ReportResult, ReportSink, ReportTree, ResultsWriter,
    ScenarioReport, ScenarioStatus, StepContext, StepHandle, StepOutcome, StepStatus,
};

#[derive(Debug, PartialEq)]
enum FlowError {
    ElementNotFound(String),
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::ElementNotFound(sel) => write!(f, "element not found: {}", sel),
        }
    }
}

fn scenario(name: &str) -> (Arc<ReportTree>, StepContext) {
    let tree = Arc::new(ReportTree::new());
    let ctx = StepContext::new(name, tree.clone());
    (tree, ctx)
}

fn finish(tree: &ReportTree, ctx: &StepContext, status: ScenarioStatus) -> ScenarioReport {
    tree.report(ctx.scenario_name(), status, None, ctx.sink_errors())
}

#[tokio::test]
async fn nested_steps_follow_invocation_order() {
    let (tree, ctx) = scenario("order");

    ctx.step("Perform search for \"q\"", |ctx| async move {
        ctx.step("Open page", |_| async { Ok::<_, FlowError>(()) }).await?;
        tokio::task::yield_now().await;
        ctx.step("Submit query", |ctx| async move {
            ctx.step("Press Enter", |_| async { Ok::<_, FlowError>(()) }).await
        })
        .await?;
        Ok::<_, FlowError>(())
    })
    .await
    .unwrap();

    let report = finish(&tree, &ctx, ScenarioStatus::Passed);
    assert_eq!(report.step_names(), vec!["Perform search for \"q\""]);

    let search = report.find_step("Perform search for \"q\"").unwrap();
    assert_eq!(search.step_names(), vec!["Open page", "Submit query"]);
    assert_eq!(search.attachments().count(), 0);
    assert_eq!(
        report.find_step("Submit query").unwrap().step_names(),
        vec!["Press Enter"]
    );
    assert!(report.sink_errors.is_empty());
}

#[tokio::test]
async fn step_stays_open_across_suspension() {
    let (tree, ctx) = scenario("suspend");
    let probe = tree.clone();

    ctx.step("slow", |_| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(probe.active_steps(), 1);
        Ok::<_, FlowError>(())
    })
    .await
    .unwrap();

    assert_eq!(tree.active_steps(), 0);
}

#[tokio::test]
async fn failing_body_returns_identical_error_and_stops_siblings() {
    let (tree, ctx) = scenario("failure");

    let result = ctx
        .step("parent", |ctx| async move {
            ctx.step("Open page", |_| async { Ok::<_, FlowError>(()) }).await?;
            ctx.step("Click missing", |_| async {
                Err::<(), _>(FlowError::ElementNotFound("#missing".into()))
            })
            .await?;
            ctx.step("never", |_| async { Ok::<_, FlowError>(()) }).await
        })
        .await;

    assert_eq!(result, Err(FlowError::ElementNotFound("#missing".into())));

    let report = finish(&tree, &ctx, ScenarioStatus::Broken);
    let parent = report.find_step("parent").unwrap();
    assert_eq!(parent.status, StepStatus::Failed);
    assert_eq!(parent.step_names(), vec!["Open page", "Click missing"]);

    let failed = report.find_step("Click missing").unwrap();
    assert_eq!(failed.status, StepStatus::Failed);
    assert_eq!(failed.status_message.as_deref(), Some("element not found: #missing"));
    assert!(report.sink_errors.is_empty(), "step must be ended exactly once");
}

#[tokio::test]
async fn attachments_go_to_innermost_active_step() {
    let (tree, ctx) = scenario("attachments");

    ctx.attachment("root-log", "started", "text/plain");
    ctx.step("A", |ctx| async move {
        ctx.step("A1", |_| async { Ok::<_, FlowError>(()) }).await?;
        ctx.step("A2", |ctx| async move {
            ctx.attachment("inner", "payload", "text/plain");
            Ok::<_, FlowError>(())
        })
        .await?;
        ctx.attachment("outer", "{}", "application/json");
        Ok::<_, FlowError>(())
    })
    .await
    .unwrap();

    let report = finish(&tree, &ctx, ScenarioStatus::Passed);
    let names = |step: &str| -> Vec<String> {
        report
            .find_step(step)
            .unwrap()
            .attachments()
            .map(|a| a.name.clone())
            .collect()
    };

    assert_eq!(names("A2"), vec!["inner"]);
    assert_eq!(names("A"), vec!["outer"]);
    assert!(names("A1").is_empty());
    assert_eq!(
        report.attachments().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        vec!["root-log"]
    );
}

#[tokio::test]
async fn metadata_attaches_to_scenario_from_any_depth() {
    let (tree, ctx) = scenario("metadata");

    ctx.owner("alice");
    ctx.links([Link::new("https://example.com/a")]);
    ctx.step("deep", |ctx| async move {
        ctx.owner("bob");
        ctx.links([Link::named("docs", "https://example.com/b")]);
        ctx.issue("BUG-7", "https://tracker.example.com/BUG-7");
        Ok::<_, FlowError>(())
    })
    .await
    .unwrap();

    let report = finish(&tree, &ctx, ScenarioStatus::Passed);
    assert_eq!(report.metadata.owner.as_deref(), Some("bob"));
    assert_eq!(report.metadata.links.len(), 3);
    assert_eq!(report.metadata.issues().count(), 1);
    assert_eq!(report.metadata.links[2].kind, LinkKind::Issue);

    let deep = report.find_step("deep").unwrap();
    assert!(deep.children.is_empty());
}

#[tokio::test]
async fn dropped_step_is_marked_aborted() {
    let (tree, ctx) = scenario("timeout");

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        ctx.step("outer", |ctx| async move {
            ctx.step("hangs", |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, FlowError>(())
            })
            .await
        }),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(tree.active_steps(), 0);

    let report = finish(&tree, &ctx, ScenarioStatus::TimedOut);
    assert_eq!(report.find_step("outer").unwrap().status, StepStatus::Aborted);
    assert_eq!(report.find_step("hangs").unwrap().status, StepStatus::Aborted);
    assert!(report.sink_errors.is_empty());
}

#[test]
fn panicking_sync_step_is_aborted() {
    let (tree, ctx) = scenario("panic");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        ctx.step_sync("explodes", |_| -> Result<(), FlowError> { panic!("boom") })
    }));
    assert!(outcome.is_err());
    assert_eq!(tree.active_steps(), 0);

    let report = finish(&tree, &ctx, ScenarioStatus::Broken);
    let step = report.find_step("explodes").unwrap();
    assert_eq!(step.status, StepStatus::Aborted);
    assert_eq!(step.status_message.as_deref(), Some("step body panicked"));
    assert!(report.sink_errors.is_empty());
}

/// Records steps in a [`ReportTree`] but cannot store attachments
struct FullDisk {
    tree: ReportTree,
}

impl ReportSink for FullDisk {
    fn begin_step(&self, name: &str, parent: Option<StepHandle>) -> ReportResult<StepHandle> {
        self.tree.begin_step(name, parent)
    }

    fn end_step(&self, handle: StepHandle, outcome: StepOutcome) -> ReportResult<()> {
        self.tree.end_step(handle, outcome)
    }

    fn attach(&self, _handle: Option<StepHandle>, _attachment: &Attachment) -> ReportResult<()> {
        Err(ReportError::Sink("disk full".into()))
    }

    fn add_link(&self, link: &Link) -> ReportResult<()> {
        self.tree.add_link(link)
    }

    fn set_owner(&self, name: &str) -> ReportResult<()> {
        self.tree.set_owner(name)
    }
}

#[tokio::test]
async fn sink_failure_does_not_change_step_result() {
    let sink = Arc::new(FullDisk { tree: ReportTree::new() });
    let ctx = StepContext::new("full disk", sink.clone());

    let result = ctx
        .step("save page", |ctx| async move {
            ctx.attachment("page", "<html></html>", "text/html");
            Ok::<_, FlowError>(3)
        })
        .await;
    assert_eq!(result, Ok(3));

    let errors = ctx.sink_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("disk full"), "{:?}", errors);

    let report = sink.tree.report("full disk", ScenarioStatus::Passed, None, errors);
    let step = report.find_step("save page").unwrap();
    assert_eq!(step.status, StepStatus::Completed);
    assert_eq!(step.attachments().count(), 0);
    assert_eq!(report.sink_errors.len(), 1);
}

#[tokio::test]
async fn parallel_scenarios_keep_independent_trees() {
    async fn run(name: &'static str) -> ScenarioReport {
        let (tree, ctx) = scenario(name);
        for i in 0..3 {
            ctx.step(format!("{}-{}", name, i), |_| async {
                tokio::task::yield_now().await;
                Ok::<_, FlowError>(())
            })
            .await
            .unwrap();
        }
        finish(&tree, &ctx, ScenarioStatus::Passed)
    }

    let (a, b) = tokio::join!(
        tokio::spawn(run("left")),
        tokio::spawn(run("right"))
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.step_names(), vec!["left-0", "left-1", "left-2"]);
    assert_eq!(b.step_names(), vec!["right-0", "right-1", "right-2"]);
}

#[tokio::test]
async fn writer_persists_results_and_attachments() {
    let (tree, ctx) = scenario("persisted");
    ctx.step("with artifact", |ctx| async move {
        ctx.attachment("page", "<html></html>", "text/html");
        Ok::<_, FlowError>(())
    })
    .await
    .unwrap();
    let report = finish(&tree, &ctx, ScenarioStatus::Passed);

    let dir = tempfile::tempdir().unwrap();
    let writer = ResultsWriter::new(dir.path()).unwrap();
    let path = writer.write_scenario(&report).unwrap();
    assert!(path.exists());

    let read = ResultsWriter::read_all(dir.path()).unwrap();
    assert_eq!(read.len(), 1);
    let attachment = read[0].find_step("with artifact").unwrap().attachments().next().unwrap();
    let source = attachment.source.as_ref().unwrap();
    assert!(source.ends_with(".html"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join(source)).unwrap(),
        "<html></html>"
    );
}
