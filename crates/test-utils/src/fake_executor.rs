use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frontpipe::tasks::{TaskExecutor, TaskId, TaskOutcome};

/// Something the fake executor observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecEvent {
    Started(TaskId),
    Finished(TaskId),
}

/// A fake executor that:
/// - records when each task starts and finishes
/// - optionally sleeps per task (Tokio time, so paused clocks work)
/// - reports `Success`, or `Failed` for tasks marked with [`FakeExecutor::fail`]
#[derive(Debug, Default, Clone)]
pub struct FakeExecutor {
    log: Arc<Mutex<Vec<ExecEvent>>>,
    failing: Arc<Mutex<HashSet<TaskId>>>,
    delays: Arc<Mutex<HashMap<TaskId, Duration>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `task` fail from now on.
    pub fn fail(&self, task: TaskId) -> &Self {
        self.failing.lock().unwrap().insert(task);
        self
    }

    /// Let `task` succeed again.
    pub fn heal(&self, task: TaskId) -> &Self {
        self.failing.lock().unwrap().remove(&task);
        self
    }

    pub fn delay(&self, task: TaskId, duration: Duration) -> &Self {
        self.delays.lock().unwrap().insert(task, duration);
        self
    }

    pub fn log(&self) -> Vec<ExecEvent> {
        self.log.lock().unwrap().clone()
    }

    /// Tasks in start order.
    pub fn started(&self) -> Vec<TaskId> {
        self.log()
            .into_iter()
            .filter_map(|e| match e {
                ExecEvent::Started(t) => Some(t),
                ExecEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn count(&self, task: TaskId) -> usize {
        self.started().into_iter().filter(|t| *t == task).count()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl TaskExecutor for FakeExecutor {
    fn run(&self, task: TaskId) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(ExecEvent::Started(task));

            let delay = self.delays.lock().unwrap().get(&task).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.log.lock().unwrap().push(ExecEvent::Finished(task));
            if self.failing.lock().unwrap().contains(&task) {
                TaskOutcome::failed(format!("{task} failed on purpose"))
            } else {
                TaskOutcome::success("fake")
            }
        })
    }
}
