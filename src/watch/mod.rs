// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Declaring the watch rules (globs, event kinds, pipelines).
//! - Compiling rule globs and ignoring frontpipe's own outputs.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does not run anything; it only turns filesystem changes into rule
//! triggers for the dispatcher.

pub mod path_utils;
pub mod patterns;
pub mod rules;
pub mod watcher;

pub use patterns::RuleMatcher;
pub use rules::{default_rules, WatchRule};
pub use watcher::{spawn_watcher, watch_dirs, WatcherHandle};
