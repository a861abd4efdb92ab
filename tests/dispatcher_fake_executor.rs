// tests/dispatcher_fake_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout, ExecEvent, FakeExecutor, TestResult};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use frontpipe::engine::{run_batch, DispatchEvent, Dispatcher, DispatcherCore};
use frontpipe::server::ReloadSignal;
use frontpipe::tasks::TaskId;
use frontpipe::types::ChangeKind;
use frontpipe::watch::WatchRule;

const DEBOUNCE: Duration = Duration::from_millis(100);

const STYLES: usize = 0;
const SCRIPTS: usize = 1;

/// styles: write-manifests → compile-styles (reloads)
/// scripts: bundle-scripts (no reload)
fn rules() -> Vec<WatchRule> {
    vec![
        WatchRule::new("styles", vec!["src/**/*.scss".to_string()], &ChangeKind::ALL)
            .stage(&[TaskId::WriteManifests])
            .stage(&[TaskId::CompileStyles]),
        WatchRule::new("scripts", vec!["src/**/*.js".to_string()], &ChangeKind::ALL)
            .stage(&[TaskId::BundleScripts])
            .without_reload(),
    ]
}

struct Harness {
    tx: mpsc::Sender<DispatchEvent>,
    exec: FakeExecutor,
    reload: ReloadSignal,
    handle: JoinHandle<()>,
}

impl Harness {
    fn start(exec: FakeExecutor) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let reload = ReloadSignal::new();
        let dispatcher = Dispatcher::new(
            DispatcherCore::new(DEBOUNCE),
            rules(),
            rx,
            Arc::new(exec.clone()),
            reload.clone(),
        );
        let handle = tokio::spawn(dispatcher.run());
        Self { tx, exec, reload, handle }
    }

    async fn trigger(&self, rule: usize) -> TestResult {
        self.tx.send(DispatchEvent::RuleTriggered { rule }).await?;
        Ok(())
    }

    async fn shutdown(self) -> TestResult {
        self.tx.send(DispatchEvent::Shutdown).await?;
        with_timeout(self.handle).await?;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_triggers_starts_one_run() -> TestResult {
    init_tracing();
    let h = Harness::start(FakeExecutor::new());

    for _ in 0..5 {
        h.trigger(STYLES).await?;
        sleep(Duration::from_millis(30)).await;
    }
    // Still inside the quiet period of the last trigger.
    assert!(h.exec.log().is_empty());

    sleep(Duration::from_millis(500)).await;
    assert_eq!(h.exec.count(TaskId::WriteManifests), 1);
    assert_eq!(h.exec.count(TaskId::CompileStyles), 1);
    assert_eq!(h.reload.current(), 1);

    h.shutdown().await
}

#[tokio::test(start_paused = true)]
async fn triggers_during_a_run_give_exactly_one_follow_up() -> TestResult {
    init_tracing();
    let exec = FakeExecutor::new();
    exec.delay(TaskId::CompileStyles, Duration::from_secs(1));
    let h = Harness::start(exec);

    h.trigger(STYLES).await?;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.exec.started(), vec![TaskId::WriteManifests, TaskId::CompileStyles]);

    // Three triggers while compile-styles is still running.
    h.trigger(SCRIPTS).await?;
    h.trigger(STYLES).await?;
    sleep(Duration::from_millis(50)).await;
    h.trigger(STYLES).await?;

    sleep(Duration::from_secs(5)).await;
    assert_eq!(
        h.exec.started(),
        vec![
            TaskId::WriteManifests,
            TaskId::CompileStyles,
            // follow-up: rules in declaration order
            TaskId::WriteManifests,
            TaskId::CompileStyles,
            TaskId::BundleScripts,
        ]
    );

    // The follow-up did not overlap the first run.
    let log = h.exec.log();
    let first_done = log
        .iter()
        .position(|e| *e == ExecEvent::Finished(TaskId::CompileStyles))
        .expect("first compile-styles finished");
    let second_start = log
        .iter()
        .rposition(|e| *e == ExecEvent::Started(TaskId::WriteManifests))
        .expect("second write-manifests started");
    assert!(first_done < second_start);

    // One reload per run.
    assert_eq!(h.reload.current(), 2);

    h.shutdown().await
}

#[tokio::test(start_paused = true)]
async fn failing_pipeline_keeps_the_dispatcher_alive() -> TestResult {
    init_tracing();
    let exec = FakeExecutor::new();
    exec.fail(TaskId::WriteManifests);
    let h = Harness::start(exec);

    h.trigger(STYLES).await?;
    h.trigger(SCRIPTS).await?;
    sleep(Duration::from_millis(300)).await;

    // Later stages of the failed rule are skipped; the other rule still runs.
    assert_eq!(h.exec.count(TaskId::WriteManifests), 1);
    assert_eq!(h.exec.count(TaskId::CompileStyles), 0);
    assert_eq!(h.exec.count(TaskId::BundleScripts), 1);
    // Reload fires regardless, so the browser shows the current output.
    assert_eq!(h.reload.current(), 1);

    // Fix the error and save again.
    h.exec.heal(TaskId::WriteManifests);
    h.trigger(STYLES).await?;
    sleep(Duration::from_millis(300)).await;

    assert_eq!(h.exec.count(TaskId::WriteManifests), 2);
    assert_eq!(h.exec.count(TaskId::CompileStyles), 1);
    assert_eq!(h.reload.current(), 2);

    h.shutdown().await
}

#[tokio::test(start_paused = true)]
async fn rules_without_reload_do_not_bump_the_generation() -> TestResult {
    init_tracing();
    let h = Harness::start(FakeExecutor::new());

    h.trigger(SCRIPTS).await?;
    sleep(Duration::from_millis(300)).await;

    assert_eq!(h.exec.count(TaskId::BundleScripts), 1);
    assert_eq!(h.reload.current(), 0);

    h.shutdown().await
}

#[tokio::test(start_paused = true)]
async fn unknown_rule_is_ignored() -> TestResult {
    init_tracing();
    let h = Harness::start(FakeExecutor::new());

    h.trigger(42).await?;
    sleep(Duration::from_millis(300)).await;
    assert!(h.exec.log().is_empty());

    h.shutdown().await
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_the_run_in_flight() -> TestResult {
    init_tracing();
    let exec = FakeExecutor::new();
    exec.delay(TaskId::CompileStyles, Duration::from_secs(2));
    let h = Harness::start(exec.clone());

    h.trigger(STYLES).await?;
    sleep(Duration::from_millis(300)).await;
    h.shutdown().await?;

    assert!(exec.log().contains(&ExecEvent::Finished(TaskId::CompileStyles)));
    Ok(())
}

#[tokio::test]
async fn run_batch_reports_each_rule_in_order() {
    init_tracing();
    let exec = FakeExecutor::new();
    exec.fail(TaskId::BundleScripts);
    let exec = Arc::new(exec);
    let reload = ReloadSignal::new();

    let report = with_timeout(run_batch(&rules(), &[STYLES, SCRIPTS], &exec, &reload)).await;

    assert_eq!(
        report.rules,
        vec![("styles".to_string(), true), ("scripts".to_string(), false)]
    );
    assert!(report.reloaded);
    assert_eq!(reload.current(), 1);
}
