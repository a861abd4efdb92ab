// src/engine/core.rs

//! Pure dispatcher state machine.
//!
//! This module contains a synchronous, deterministic core that consumes rule
//! triggers, timer expiries and run completions, and tells the IO shell when
//! to start a run and with which rules.
//!
//! The async shell (`engine::runtime::Dispatcher`) is responsible for:
//! - reading events from the channel
//! - sleeping until [`DispatcherCore::deadline`]
//! - executing the rule pipelines and firing the reload signal
//!
//! Time is passed in explicitly, so the core can be tested without Tokio.

use std::time::{Duration, Instant};

use tracing::debug;

use super::queue::PendingRules;

/// Dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing pending, nothing running.
    Idle,
    /// Waiting for the burst to settle; a new trigger pushes the deadline.
    Debouncing { deadline: Instant },
    /// A run is executing; no trigger arrived since it started.
    Running,
    /// A run is executing and at least one trigger arrived meanwhile.
    RunPending,
}

/// Command produced by the core, to be executed by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCommand {
    /// Run the pipelines of these rules (declaration indices, ascending).
    StartRun(Vec<usize>),
}

#[derive(Debug)]
pub struct DispatcherCore {
    state: DispatchState,
    debounce: Duration,
    pending: PendingRules,
}

impl DispatcherCore {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: DispatchState::Idle,
            debounce,
            pending: PendingRules::new(),
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// When the shell should call [`DispatcherCore::on_deadline`].
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DispatchState::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DispatchState::Running | DispatchState::RunPending)
    }

    /// A rule matched a filesystem event.
    pub fn on_trigger(&mut self, rule: usize, now: Instant) {
        self.pending.record(rule);
        self.state = match self.state {
            DispatchState::Idle | DispatchState::Debouncing { .. } => DispatchState::Debouncing {
                deadline: now + self.debounce,
            },
            DispatchState::Running | DispatchState::RunPending => DispatchState::RunPending,
        };
        debug!(rule, state = ?self.state, "trigger recorded");
    }

    /// The debounce timer fired.
    ///
    /// Spurious or early wakeups are ignored.
    pub fn on_deadline(&mut self, now: Instant) -> Option<DispatchCommand> {
        match self.state {
            DispatchState::Debouncing { deadline } if now >= deadline => self.start_run(),
            _ => None,
        }
    }

    /// The current run finished (successfully or not).
    ///
    /// If triggers arrived during the run, exactly one follow-up run covering
    /// all of them starts right away.
    pub fn on_run_finished(&mut self) -> Option<DispatchCommand> {
        match self.state {
            DispatchState::RunPending => self.start_run(),
            DispatchState::Running => {
                self.state = DispatchState::Idle;
                None
            }
            // Not running: nothing to finish.
            _ => None,
        }
    }

    fn start_run(&mut self) -> Option<DispatchCommand> {
        let rules = self.pending.drain();
        if rules.is_empty() {
            self.state = DispatchState::Idle;
            return None;
        }
        self.state = DispatchState::Running;
        debug!(?rules, "starting run");
        Some(DispatchCommand::StartRun(rules))
    }
}
