// src/dag/mod.rs

//! Stage graphs and their execution.
//!
//! - [`graph`] holds the static stage lists and their validation.
//! - [`runner`] executes a stage list against a task executor.

pub mod graph;
pub mod runner;

pub use graph::{BuildGraph, GraphError, Stage};
pub use runner::{run_stages, RunReport, TaskResult};
