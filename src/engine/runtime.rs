// src/engine/runtime.rs

use std::fmt;
use std::future::pending;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::dag::run_stages;
use crate::server::ReloadSignal;
use crate::tasks::TaskExecutor;
use crate::watch::WatchRule;

use super::core::{DispatchCommand, DispatcherCore};
use super::DispatchEvent;

/// Summary of one dispatcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Rule names in execution order, with whether their pipeline succeeded.
    pub rules: Vec<(String, bool)>,
    pub reloaded: bool,
}

/// Drives the pure [`DispatcherCore`] from rule triggers, a debounce timer
/// and run completions, and delegates task execution to a [`TaskExecutor`].
///
/// At most one run is in flight. A run executes the pipeline of every rule in
/// its batch, one rule after the other, then fires the reload signal once if
/// any of those rules asks for it.
pub struct Dispatcher<E: TaskExecutor + ?Sized + 'static> {
    core: DispatcherCore,
    rules: Arc<Vec<WatchRule>>,
    event_rx: mpsc::Receiver<DispatchEvent>,
    executor: Arc<E>,
    reload: ReloadSignal,
}

impl<E: TaskExecutor + ?Sized + 'static> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("core", &self.core)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor + ?Sized + 'static> Dispatcher<E> {
    pub fn new(
        core: DispatcherCore,
        rules: Vec<WatchRule>,
        event_rx: mpsc::Receiver<DispatchEvent>,
        executor: Arc<E>,
        reload: ReloadSignal,
    ) -> Self {
        Self {
            core,
            rules: Arc::new(rules),
            event_rx,
            executor,
            reload,
        }
    }

    /// Main loop. Returns when the channel closes or on shutdown, after the
    /// run in flight (if any) finished.
    pub async fn run(mut self) {
        info!(rules = self.rules.len(), "dispatcher started");
        let mut running: Option<JoinHandle<BatchReport>> = None;

        loop {
            let deadline = self.core.deadline().map(Instant::from_std);

            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(DispatchEvent::RuleTriggered { rule }) => {
                            if rule >= self.rules.len() {
                                warn!(rule, "trigger for unknown rule ignored");
                                continue;
                            }
                            debug!(rule = %self.rules[rule].name, "rule triggered");
                            self.core.on_trigger(rule, Instant::now().into_std());
                        }
                        Some(DispatchEvent::Shutdown) | None => {
                            info!("dispatcher shutting down");
                            break;
                        }
                    }
                }

                _ = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => pending::<()>().await,
                    }
                }, if deadline.is_some() && running.is_none() => {
                    if let Some(command) = self.core.on_deadline(Instant::now().into_std()) {
                        running = Some(self.start(command));
                    }
                }

                joined = async {
                    match running.as_mut() {
                        Some(handle) => handle.await,
                        None => pending().await,
                    }
                }, if running.is_some() => {
                    running = None;
                    match joined {
                        Ok(report) => debug!(?report, "run finished"),
                        Err(err) => error!(error = %err, "dispatcher run panicked"),
                    }
                    if let Some(command) = self.core.on_run_finished() {
                        running = Some(self.start(command));
                    }
                }
            }
        }

        if let Some(handle) = running {
            if let Err(err) = handle.await {
                error!(error = %err, "dispatcher run panicked");
            }
        }
        info!("dispatcher exiting");
    }

    fn start(&self, command: DispatchCommand) -> JoinHandle<BatchReport> {
        let DispatchCommand::StartRun(batch) = command;
        let rules = Arc::clone(&self.rules);
        let executor = Arc::clone(&self.executor);
        let reload = self.reload.clone();
        tokio::spawn(async move { run_batch(&rules, &batch, &executor, &reload).await })
    }
}

/// Execute the pipelines of `batch` in order, then reload once if asked.
///
/// A failed pipeline is logged and does not stop the other rules.
pub async fn run_batch<E>(
    rules: &[WatchRule],
    batch: &[usize],
    executor: &Arc<E>,
    reload: &ReloadSignal,
) -> BatchReport
where
    E: TaskExecutor + ?Sized + 'static,
{
    let mut report = BatchReport::default();
    let mut wants_reload = false;

    for &index in batch {
        let Some(rule) = rules.get(index) else {
            continue;
        };
        let run = run_stages(executor, &rule.pipeline, &rule.name).await;
        if !run.is_success() {
            error!(rule = %rule.name, "watch pipeline failed; waiting for the next change");
        }
        wants_reload |= rule.reload;
        report.rules.push((rule.name.clone(), run.is_success()));
    }

    if wants_reload {
        reload.trigger();
        report.reloaded = true;
    }
    report
}
