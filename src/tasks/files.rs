// src/tasks/files.rs

//! In-process file operations: clearing the output root and copying assets.
//!
//! These are blocking; the executor runs them on the blocking pool.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::AssetRule;
use crate::fs::glob::collect_matching;

use super::tracker::{compute_file_hash, ChangeTracker};

/// Remove every entry inside `dir`, keeping `dir` itself.
///
/// Returns the number of top-level entries removed; an absent directory
/// counts as already clear.
pub fn clear_dir_contents(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let path = entry?.path();
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("removing dir {:?}", path))?;
        } else {
            fs::remove_file(&path).with_context(|| format!("removing file {:?}", path))?;
        }
        removed += 1;
    }
    Ok(removed)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
    debug!(from = ?from, to = ?to, "copied file");
    Ok(())
}

/// Copy every file matched by each asset rule into its destination folder,
/// keeping the path below the glob's literal base.
pub fn copy_assets(root: &Path, rules: &[AssetRule], dest_root: &Path) -> Result<usize> {
    let mut copied = 0;
    for rule in rules {
        let target = if rule.dest_subdir.is_empty() {
            dest_root.to_path_buf()
        } else {
            dest_root.join(&rule.dest_subdir)
        };
        for file in collect_matching(root, &rule.pattern)? {
            copy_file(&file.path, &target.join(&file.below_base))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Counts reported by [`copy_changed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    pub unchanged: usize,
}

/// Copy files matching `pattern` whose content changed since the last call
/// (or whose destination disappeared).
pub fn copy_changed(
    root: &Path,
    pattern: &str,
    dest_dir: &Path,
    tracker: &mut ChangeTracker,
) -> Result<CopyReport> {
    let files = collect_matching(root, pattern)?;
    tracker.retain_present(files.iter().map(|f| f.path.as_path()));

    let mut report = CopyReport::default();
    for file in &files {
        let target = dest_dir.join(&file.below_base);
        let hash = compute_file_hash(&file.path)?;
        if !tracker.is_changed(&file.path, &hash) && target.exists() {
            report.unchanged += 1;
            continue;
        }
        copy_file(&file.path, &target)?;
        tracker.record(file.path.clone(), hash);
        report.copied += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn clear_keeps_root_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("build");
        assert_eq!(clear_dir_contents(&out).unwrap(), 0);

        fs::create_dir_all(out.join("css")).unwrap();
        fs::write(out.join("css/app.css"), b"x").unwrap();
        fs::write(out.join("index.html"), b"x").unwrap();

        assert_eq!(clear_dir_contents(&out).unwrap(), 2);
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn assets_keep_relative_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/fonts/roboto")).unwrap();
        fs::write(root.join("src/fonts/roboto/r.woff2"), b"font").unwrap();

        let rules = vec![AssetRule {
            pattern: "src/fonts/**/*.{woff,woff2}".into(),
            dest_subdir: "fonts".into(),
        }];
        let dest = root.join("build");
        assert_eq!(copy_assets(root, &rules, &dest).unwrap(), 1);
        assert_eq!(fs::read(dest.join("fonts/roboto/r.woff2")).unwrap(), b"font");
    }

    #[test]
    fn changed_copy_skips_unchanged_and_restores_missing() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/img")).unwrap();
        fs::write(root.join("src/img/logo.png"), b"png").unwrap();
        let dest = root.join("build/img");
        let mut tracker = ChangeTracker::new();
        let pattern = "src/img/**/*.png";

        let first = copy_changed(root, pattern, &dest, &mut tracker).unwrap();
        assert_eq!(first, CopyReport { copied: 1, unchanged: 0 });

        let second = copy_changed(root, pattern, &dest, &mut tracker).unwrap();
        assert_eq!(second, CopyReport { copied: 0, unchanged: 1 });

        fs::remove_file(dest.join("logo.png")).unwrap();
        let third = copy_changed(root, pattern, &dest, &mut tracker).unwrap();
        assert_eq!(third.copied, 1);
    }
}
