// src/manifest/scan.rs

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::manifest::ManifestKind;

/// Find every immediate subdirectory `<name>` of `root` that contains
/// `<name>.<ext>` for one of the kind's extensions.
///
/// Returns component-relative entries (`<name>/<name>.<ext>`) ordered by
/// directory name. A missing root is "no components", not an error.
pub fn scan_components(fs: &dyn FileSystem, root: &Path, kind: ManifestKind) -> Result<Vec<String>> {
    if !fs.is_dir(root) {
        debug!(root = ?root, %kind, "component root absent; no entries");
        return Ok(Vec::new());
    }

    let mut dirs: Vec<String> = fs
        .read_dir(root)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();
    dirs.sort();

    let mut entries = Vec::new();
    for name in dirs {
        let dir = root.join(&name);
        let found = kind
            .extensions()
            .iter()
            .find(|ext| fs.is_file(&dir.join(format!("{name}.{ext}"))));

        if let Some(ext) = found {
            entries.push(format!("{name}/{name}.{ext}"));
        }
    }

    debug!(root = ?root, %kind, count = entries.len(), "scanned components");
    Ok(entries)
}
