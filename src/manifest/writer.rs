// src/manifest/writer.rs

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::manifest::{build_entries, render, scan_components, ManifestEntry, ManifestKind};

/// Static description of one generated manifest.
#[derive(Debug, Clone)]
pub struct ManifestSpec {
    pub kind: ManifestKind,
    /// Directory holding one subdirectory per component.
    pub component_root: PathBuf,
    /// File to (re)generate.
    pub output: PathBuf,
    /// Prepended to component entries when rendering directives.
    pub import_prefix: String,
    /// Entries placed before the scanned components.
    pub prefix_entries: Vec<String>,
}

/// What the writer produced last time.
///
/// `None` until the first generation in this process, which always writes.
/// Callers keep the value returned by [`regenerate`] and pass it back in on
/// the next call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestState {
    entries: Option<Vec<ManifestEntry>>,
}

impl ManifestState {
    pub fn entries(&self) -> &[ManifestEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }

    pub fn is_initial(&self) -> bool {
        self.entries.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Same entry set as before; the file was not touched.
    Unchanged,
    /// The file was rewritten.
    Written { added: Vec<String>, removed: Vec<String> },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Rescan, diff against `previous`, write if the entry set changed.
pub fn regenerate(
    fs: &dyn FileSystem,
    spec: &ManifestSpec,
    previous: &ManifestState,
) -> Result<(ManifestState, WriteOutcome)> {
    let scanned = scan_components(fs, &spec.component_root, spec.kind)?;
    let entries = build_entries(&spec.prefix_entries, &scanned);

    let (added, removed) = match &previous.entries {
        Some(prev) => symmetric_difference(prev, &entries),
        None => (entries.iter().map(|e| e.path.clone()).collect(), Vec::new()),
    };

    if !previous.is_initial() && added.is_empty() && removed.is_empty() {
        debug!(kind = %spec.kind, output = ?spec.output, "manifest unchanged; skipping write");
        return Ok((previous.clone(), WriteOutcome::Unchanged));
    }

    let text = render(spec.kind, &spec.import_prefix, &entries);
    fs.write(&spec.output, text.as_bytes())?;

    info!(
        kind = %spec.kind,
        output = ?spec.output,
        entries = entries.len(),
        ?added,
        ?removed,
        "manifest written"
    );

    Ok((ManifestState { entries: Some(entries) }, WriteOutcome::Written { added, removed }))
}

fn symmetric_difference(
    prev: &[ManifestEntry],
    next: &[ManifestEntry],
) -> (Vec<String>, Vec<String>) {
    let prev_set: HashSet<&ManifestEntry> = prev.iter().collect();
    let next_set: HashSet<&ManifestEntry> = next.iter().collect();

    let added = next
        .iter()
        .filter(|e| !prev_set.contains(e))
        .map(|e| e.path.clone())
        .collect();
    let removed = prev
        .iter()
        .filter(|e| !next_set.contains(e))
        .map(|e| e.path.clone())
        .collect();

    (added, removed)
}
