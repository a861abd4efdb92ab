// src/watch/path_utils.rs

use std::path::Path;

/// Project-relative form of `path` with forward slashes, as the rule globs
/// expect it.
///
/// Notify may report paths under a different absolute prefix than the one we
/// watched (symlinked temp dirs on macOS), so a failed plain prefix strip is
/// retried on canonical paths. Deleted files cannot be canonicalized and only
/// take the first route.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let to_slash = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root = root.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    path.strip_prefix(&root).ok().map(to_slash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_and_normalises_separators() {
        assert_eq!(
            relative_str(Path::new("/p"), Path::new("/p/src/blocks/a/a.scss")).as_deref(),
            Some("src/blocks/a/a.scss")
        );
        assert_eq!(relative_str(Path::new("/p"), Path::new("/q/x")), None);
    }
}
