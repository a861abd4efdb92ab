// src/manifest/mod.rs

//! Generated import/include manifests.
//!
//! A component lives in `<blocks>/<name>/` and contributes `<name>.<ext>` to
//! the manifest of its kind. The writer rescans the component root, diffs the
//! result against the previous generation and only rewrites the file when the
//! set of entries changed, so an unchanged tree never retriggers the style or
//! template compilers.

pub mod scan;
pub mod writer;

use std::fmt;

pub use scan::scan_components;
pub use writer::{regenerate, ManifestSpec, ManifestState, WriteOutcome};

/// Which manifest is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    Style,
    Template,
}

impl ManifestKind {
    /// Accepted extensions, in order of preference when a component has
    /// several candidates.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ManifestKind::Style => &["scss", "sass"],
            ManifestKind::Template => &["pug"],
        }
    }

    fn comment_prefix(self) -> &'static str {
        match self {
            ManifestKind::Style => "//",
            ManifestKind::Template => "//-",
        }
    }

    /// Banner written as the first lines of every generated file.
    pub fn banner(self) -> String {
        let c = self.comment_prefix();
        format!(
            "{c} Generated by frontpipe from the component directory.\n\
             {c} Do not edit: changes are overwritten on the next build.\n"
        )
    }

    fn directive(self, target: &str) -> String {
        match self {
            ManifestKind::Style => format!("@import \"{target}\";"),
            ManifestKind::Template => format!("include {target}"),
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Style => f.write_str("style"),
            ManifestKind::Template => f.write_str("template"),
        }
    }
}

/// One manifest line before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifestEntry {
    /// Component-relative path (`button/button.scss`) or a configured
    /// prefix entry, verbatim.
    pub path: String,
    /// Configured prefix entries are rendered without the import prefix.
    pub fixed: bool,
}

impl ManifestEntry {
    pub fn fixed(path: impl Into<String>) -> Self {
        Self { path: path.into(), fixed: true }
    }

    pub fn component(path: impl Into<String>) -> Self {
        Self { path: path.into(), fixed: false }
    }
}

/// Ordered manifest content: prefix entries first, then components in scan
/// order, without duplicates.
pub fn build_entries(prefix: &[String], scanned: &[String]) -> Vec<ManifestEntry> {
    let mut entries: Vec<ManifestEntry> = Vec::with_capacity(prefix.len() + scanned.len());

    for p in prefix {
        if !entries.iter().any(|e| &e.path == p) {
            entries.push(ManifestEntry::fixed(p.clone()));
        }
    }
    for s in scanned {
        if !entries.iter().any(|e| &e.path == s) {
            entries.push(ManifestEntry::component(s.clone()));
        }
    }

    entries
}

/// Render the full file: banner, then one directive per entry.
pub fn render(kind: ManifestKind, import_prefix: &str, entries: &[ManifestEntry]) -> String {
    let mut out = kind.banner();
    out.push('\n');
    for entry in entries {
        let line = if entry.fixed {
            kind.directive(&entry.path)
        } else {
            kind.directive(&format!("{import_prefix}{}", entry.path))
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prefix_entries_come_first_and_are_not_repeated() {
        let entries = build_entries(
            &strings(&["app.scss", "app.scss"]),
            &strings(&["app.scss", "button/button.scss", "card/card.scss"]),
        );
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["app.scss", "button/button.scss", "card/card.scss"]);
        assert!(entries[0].fixed);
        assert!(!entries[1].fixed);
    }

    #[test]
    fn style_render_prefixes_only_components() {
        let entries = build_entries(&strings(&["app.scss"]), &strings(&["card/card.scss"]));
        let text = render(ManifestKind::Style, "../blocks/", &entries);

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("// Generated by frontpipe"));
        assert!(text.ends_with("@import \"app.scss\";\n@import \"../blocks/card/card.scss\";\n"));
    }

    #[test]
    fn template_render_uses_include_and_pug_comments() {
        let entries = build_entries(&[], &strings(&["menu/menu.pug"]));
        let text = render(ManifestKind::Template, "../blocks/", &entries);
        assert!(text.starts_with("//- Generated by frontpipe"));
        assert!(text.ends_with("include ../blocks/menu/menu.pug\n"));
    }
}
