// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, validate_source_root, ConfigFile, EnvOverrides};
use crate::dag::{run_stages, BuildGraph, RunReport};
use crate::engine::{DispatchEvent, Dispatcher, DispatcherCore};
use crate::errors::{FrontpipeError, Result};
use crate::fs::RealFileSystem;
use crate::server::{DevServer, ReloadSignal, SiteHandler};
use crate::tasks::{BuildExecutor, Registry, TaskExecutor};
use crate::watch::{default_rules, spawn_watcher, RuleMatcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - environment + config loading
/// - the startup checks
/// - `build` or `develop`
pub async fn run(args: CliArgs) -> Result<()> {
    let env = EnvOverrides::from_env();
    let cfg = load_and_validate(&args.config, &env)?;
    info!(
        mode = %cfg.mode,
        root = ?cfg.root(),
        dest = ?cfg.dest_root(),
        "configuration loaded"
    );

    validate_source_root(&cfg, &RealFileSystem)?;
    BuildGraph::build()
        .validate(&Registry::from_config(&cfg))
        .map_err(|e| FrontpipeError::Config(e.to_string()))?;

    let cfg = Arc::new(cfg);
    match args.command {
        Some(Command::Build) => build(cfg).await,
        None => develop(cfg).await,
    }
}

/// Run the full build graph once with `executor`.
pub async fn build_with<E>(executor: &Arc<E>) -> RunReport
where
    E: TaskExecutor + ?Sized + 'static,
{
    run_stages(executor, BuildGraph::build().stages(), "build").await
}

/// One-shot build. Any failed task makes the whole command fail.
pub async fn build(cfg: Arc<ConfigFile>) -> Result<()> {
    let executor = Arc::new(BuildExecutor::new(cfg));
    let report = build_with(&executor).await;
    if report.is_success() {
        info!(elapsed_ms = report.elapsed.as_millis() as u64, "build complete");
        return Ok(());
    }

    let failed: Vec<String> = report.failures().map(|r| r.task.to_string()).collect();
    Err(FrontpipeError::Build(failed.join(", ")))
}

/// Build, then serve the output and rebuild on change until Ctrl-C.
///
/// A failing initial build is logged; the watcher is armed anyway so the
/// next fix triggers a rebuild.
pub async fn develop(cfg: Arc<ConfigFile>) -> Result<()> {
    let executor = Arc::new(BuildExecutor::new(Arc::clone(&cfg)));
    let report = build_with(&executor).await;
    if !report.is_success() {
        let failed: Vec<String> = report.failures().map(|r| r.task.to_string()).collect();
        warn!(?failed, "initial build failed; watching for changes anyway");
    }

    let reload = ReloadSignal::new();
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let server = DevServer::bind(&addr, SiteHandler::from_config(&cfg, reload.clone()))?.spawn();

    let rules = default_rules(&cfg);
    let matcher = RuleMatcher::new(&rules)?.ignore_outputs(&cfg);

    // Dispatcher event channel.
    let (tx, rx) = mpsc::channel::<DispatchEvent>(64);
    let _watcher = spawn_watcher(&cfg, matcher, tx.clone())?;

    // Ctrl-C → graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = tx.send(DispatchEvent::Shutdown).await;
    });

    let core = DispatcherCore::new(cfg.debounce());
    Dispatcher::new(core, rules, rx, executor, reload).run().await;

    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .map_err(|e| FrontpipeError::Server(e.to_string()))?;
    Ok(())
}
