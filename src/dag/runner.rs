// src/dag/runner.rs

//! Generic stage runner.
//!
//! Every task of a stage is started on a [`JoinSet`]; the next stage begins
//! only after all of them finished. A stage with a failed task is the last
//! one executed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::tasks::{TaskExecutor, TaskId, TaskOutcome};

use super::graph::Stage;

/// Outcome of one task inside a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub stage: usize,
    pub task: TaskId,
    pub outcome: TaskOutcome,
}

/// What happened during [`run_stages`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Results in stage order; within a stage, in declaration order.
    pub results: Vec<TaskResult>,
    /// Number of stages that were started.
    pub stages_run: usize,
    /// Number of stages skipped after a failure.
    pub stages_skipped: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn outcome_of(&self, task: TaskId) -> Option<&TaskOutcome> {
        self.results.iter().find(|r| r.task == task).map(|r| &r.outcome)
    }
}

/// Run `stages` in order using `executor`.
///
/// `label` names the pipeline in logs (`build`, or a watch rule name).
pub async fn run_stages<E>(executor: &Arc<E>, stages: &[Stage], label: &str) -> RunReport
where
    E: TaskExecutor + ?Sized + 'static,
{
    let started = Instant::now();
    let mut report = RunReport::default();

    for (index, stage) in stages.iter().enumerate() {
        info!(pipeline = %label, stage = index, tasks = ?stage, "starting stage");
        report.stages_run += 1;

        let mut set = JoinSet::new();
        let mut ids = HashMap::new();
        for &task in stage {
            let exec = Arc::clone(executor);
            let handle = set.spawn(async move { exec.run(task).await });
            ids.insert(handle.id(), task);
        }

        let mut finished: HashMap<TaskId, TaskOutcome> = HashMap::new();
        while let Some(joined) = set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(err) => (err.id(), TaskOutcome::failed(format!("task panicked: {err}"))),
            };
            let Some(&task) = ids.get(&id) else {
                continue;
            };
            log_outcome(label, task, &outcome);
            finished.insert(task, outcome);
        }

        let mut failed = false;
        for &task in stage {
            if let Some(outcome) = finished.remove(&task) {
                failed |= outcome.is_failure();
                report.results.push(TaskResult { stage: index, task, outcome });
            }
        }

        if failed {
            report.stages_skipped = stages.len() - index - 1;
            if report.stages_skipped > 0 {
                error!(
                    pipeline = %label,
                    stage = index,
                    skipped = report.stages_skipped,
                    "stage failed; skipping remaining stages"
                );
            }
            break;
        }
    }

    report.elapsed = started.elapsed();
    info!(
        pipeline = %label,
        success = report.is_success(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "pipeline finished"
    );
    report
}

fn log_outcome(label: &str, task: TaskId, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Success { summary } => {
            info!(pipeline = %label, task = %task, %summary, "task succeeded")
        }
        TaskOutcome::Skipped { reason } => {
            info!(pipeline = %label, task = %task, %reason, "task skipped")
        }
        TaskOutcome::Failed { message } => {
            error!(pipeline = %label, task = %task, %message, "task failed")
        }
    }
}
