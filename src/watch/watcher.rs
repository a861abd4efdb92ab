// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::engine::DispatchEvent;
use crate::types::ChangeKind;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::RuleMatcher;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Translate a notify event into per-path change kinds.
///
/// Renames become a delete of the old path and a create of the new one.
/// Access and metadata-only events are dropped.
pub fn classify(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Remove(_) => ChangeKind::Delete,
        EventKind::Modify(ModifyKind::Name(mode)) => {
            return match (mode, event.paths.as_slice()) {
                (RenameMode::Both, [from, to, ..]) => vec![
                    (from.clone(), ChangeKind::Delete),
                    (to.clone(), ChangeKind::Create),
                ],
                (RenameMode::From, paths) => {
                    paths.iter().map(|p| (p.clone(), ChangeKind::Delete)).collect()
                }
                (_, paths) => paths.iter().map(|p| (p.clone(), ChangeKind::Create)).collect(),
            };
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => ChangeKind::Change,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };
    event.paths.iter().map(|p| (p.clone(), kind)).collect()
}

/// Rule indices triggered by one change below `root`.
pub fn triggered_rules(
    root: &Path,
    matcher: &RuleMatcher,
    path: &Path,
    kind: ChangeKind,
) -> Vec<usize> {
    match relative_str(root, path) {
        Some(rel) => matcher.matching(&rel, kind),
        None => Vec::new(),
    }
}

/// Directories `develop` watches, relative to the project root.
///
/// The source root plus every `[src]` directory that lies outside it. Nested
/// entries are dropped since the watches are recursive.
pub fn watch_dirs(cfg: &ConfigFile) -> Vec<String> {
    let src = &cfg.src;
    let mut candidates: Vec<&str> = [
        &src.root, &src.pages, &src.pug, &src.blocks, &src.scss, &src.js, &src.img, &src.icons,
    ]
    .into_iter()
    .map(String::as_str)
    .collect();
    candidates.sort();
    candidates.dedup();

    let mut dirs: Vec<String> = Vec::new();
    for dir in candidates {
        if dirs.iter().any(|kept| Path::new(dir).starts_with(kept)) {
            continue;
        }
        dirs.push(dir.to_string());
    }
    dirs
}

/// Spawn a filesystem watcher over the source directories of `cfg` and send
/// [`DispatchEvent::RuleTriggered`] for every rule whose globs match a
/// changed path.
///
/// Paths are matched relative to the project root. Anything outside the
/// watched directories (`node_modules`, the output root) is never seen.
pub fn spawn_watcher(
    cfg: &ConfigFile,
    matcher: RuleMatcher,
    dispatch_tx: mpsc::Sender<DispatchEvent>,
) -> Result<WatcherHandle> {
    let root = cfg.root().to_path_buf();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watch event dropped; dispatcher loop is gone");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    let mut watched = Vec::new();
    for dir in watch_dirs(cfg) {
        let path = cfg.path(&dir);
        let Ok(path) = path.canonicalize() else {
            debug!(dir = %dir, "not watching missing directory");
            continue;
        };
        watcher.watch(&path, RecursiveMode::Recursive)?;
        watched.push(dir);
    }

    info!(?root, ?watched, "file watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            for (path, kind) in classify(&event) {
                for rule in triggered_rules(&root, &matcher, &path, kind) {
                    debug!(
                        path = ?path,
                        %kind,
                        rule = matcher.rule_name(rule).unwrap_or("?"),
                        "path matched watch rule"
                    );
                    if dispatch_tx.send(DispatchEvent::RuleTriggered { rule }).await.is_err() {
                        debug!("dispatcher channel closed; stopping watcher loop");
                        return;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, RawConfigFile};
    use crate::watch::rules::default_rules;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut ev = Event::new(kind);
        for p in paths {
            ev = ev.add_path(PathBuf::from(p));
        }
        ev
    }

    #[test]
    fn classify_maps_kinds() {
        let created = event(EventKind::Create(CreateKind::File), &["/p/a.scss"]);
        assert_eq!(classify(&created), vec![(PathBuf::from("/p/a.scss"), ChangeKind::Create)]);

        let written = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/p/a"]);
        assert_eq!(classify(&written), vec![(PathBuf::from("/p/a"), ChangeKind::Change)]);

        let removed = event(EventKind::Remove(RemoveKind::File), &["/p/a"]);
        assert_eq!(classify(&removed), vec![(PathBuf::from("/p/a"), ChangeKind::Delete)]);

        let touched = event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)), &["/p/a"]);
        assert!(classify(&touched).is_empty());
    }

    #[test]
    fn rename_is_delete_then_create() {
        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old.pug", "/p/new.pug"],
        );
        assert_eq!(
            classify(&renamed),
            vec![
                (PathBuf::from("/p/old.pug"), ChangeKind::Delete),
                (PathBuf::from("/p/new.pug"), ChangeKind::Create),
            ]
        );
    }

    #[test]
    fn watches_the_source_root_and_source_dirs_outside_it() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(watch_dirs(&cfg), vec!["src"]);

        let mut raw = RawConfigFile::default();
        raw.src.img = "assets/img".to_string();
        raw.src.icons = "assets/img/icons".to_string();
        raw.src.js = "scripts".to_string();
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(watch_dirs(&cfg), vec!["assets/img", "scripts", "src"]);
    }

    #[test]
    fn paths_outside_root_trigger_nothing() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        let matcher = RuleMatcher::new(&default_rules(&cfg)).unwrap();
        let root = Path::new("/project");

        assert_eq!(
            triggered_rules(root, &matcher, Path::new("/project/src/js/app.js"), ChangeKind::Change),
            vec![3]
        );
        assert!(
            triggered_rules(root, &matcher, Path::new("/elsewhere/src/js/app.js"), ChangeKind::Change)
                .is_empty()
        );
    }
}
