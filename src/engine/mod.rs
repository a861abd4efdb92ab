// src/engine/mod.rs

//! Watch dispatcher.
//!
//! This module ties together:
//! - the pending-rule batch (what happens when triggers arrive while a run
//!   is active)
//! - the debounce state machine
//! - the async loop that reacts to:
//!   - rule triggers from the file watcher
//!   - debounce deadlines
//!   - run completions
//!   - shutdown
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Events flowing into the dispatcher from the watcher and the shutdown
/// handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A watch rule (by declaration index) matched a filesystem change.
    RuleTriggered { rule: usize },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    Shutdown,
}

pub mod core;
pub mod queue;
pub mod runtime;

pub use core::{DispatchCommand, DispatchState, DispatcherCore};
pub use queue::PendingRules;
pub use runtime::{run_batch, BatchReport, Dispatcher};
