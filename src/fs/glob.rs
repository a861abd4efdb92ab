// src/fs/glob.rs

//! Glob helpers shared by the task registry and the watcher.
//!
//! Patterns are always written relative to the project root with forward
//! slashes, e.g. `src/img/**/*.{png,svg}`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// A file found by [`collect_matching`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchedFile {
    /// Path on disk.
    pub path: PathBuf,
    /// Path relative to the literal base of the pattern (`fonts/a.woff` for
    /// `src/**/*.woff` matching `src/fonts/a.woff`). Copies preserve this part.
    pub below_base: PathBuf,
}

/// Build a GlobSet from simple string patterns.
///
/// `*` does not cross `/`; use `**` for that.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Leading path components of `pattern` that contain no glob syntax.
///
/// `src/img/**/*.png` → `src/img`; `*.svg` → `` (empty).
pub fn glob_base(pattern: &str) -> String {
    let mut base: Vec<&str> = Vec::new();
    let parts: Vec<&str> = pattern.split('/').collect();
    // The last component is a file pattern even without metacharacters.
    for part in &parts[..parts.len().saturating_sub(1)] {
        if part.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(part);
    }
    base.join("/")
}

/// Every regular file below `root` matching `pattern`, sorted by path.
///
/// A missing base directory yields an empty list.
pub fn collect_matching(root: &Path, pattern: &str) -> Result<Vec<MatchedFile>> {
    let set = build_globset(&[pattern.to_string()])?;
    let base_rel = glob_base(pattern);
    let base = if base_rel.is_empty() { root.to_path_buf() } else { root.join(&base_rel) };

    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(&base).follow_links(true) {
        let entry = entry.with_context(|| format!("walking {:?}", base))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if !set.is_match(&rel_str) {
            continue;
        }
        let below_base = path.strip_prefix(&base).unwrap_or(rel).to_path_buf();
        out.push(MatchedFile { path: path.to_path_buf(), below_base });
    }

    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn base_stops_at_first_glob_component() {
        assert_eq!(glob_base("src/img/**/*.{png,svg}"), "src/img");
        assert_eq!(glob_base("src/icons/*.svg"), "src/icons");
        assert_eq!(glob_base("src/js/app.js"), "src/js");
        assert_eq!(glob_base("*.svg"), "");
        assert_eq!(glob_base("src/{a,b}/x.txt"), "src");
    }

    #[test]
    fn collects_matches_relative_to_base() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/fonts/sub")).unwrap();
        fs::write(root.join("src/fonts/a.woff"), b"a").unwrap();
        fs::write(root.join("src/fonts/sub/b.woff2"), b"b").unwrap();
        fs::write(root.join("src/fonts/readme.txt"), b"c").unwrap();

        let found = collect_matching(root, "src/fonts/**/*.{woff,woff2}").unwrap();
        let below: Vec<PathBuf> = found.iter().map(|m| m.below_base.clone()).collect();
        assert_eq!(below, vec![PathBuf::from("a.woff"), PathBuf::from("sub/b.woff2")]);
    }

    #[test]
    fn missing_base_is_empty() {
        let dir = tempdir().unwrap();
        assert!(collect_matching(dir.path(), "src/nothing/**/*.png").unwrap().is_empty());
    }
}
