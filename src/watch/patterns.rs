// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::model::normalize;
use crate::config::ConfigFile;
use crate::fs::glob::build_globset;
use crate::types::ChangeKind;
use crate::watch::path_utils::relative_str;
use crate::watch::rules::WatchRule;

/// Compiled globs of a single rule.
#[derive(Clone)]
struct CompiledRule {
    name: String,
    set: GlobSet,
    events: Vec<ChangeKind>,
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("name", &self.name)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Maps a changed path to the rules interested in it.
///
/// Paths are relative to the project root with forward slashes, e.g.
/// `"src/blocks/card/card.scss"`. Paths below an ignored prefix (the output
/// root, the generated manifests) never match.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
    ignored: Vec<String>,
}

impl RuleMatcher {
    pub fn new(rules: &[WatchRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let set = build_globset(&rule.globs)
                    .with_context(|| format!("building watch globset for rule {}", rule.name))?;
                Ok(CompiledRule {
                    name: rule.name.clone(),
                    set,
                    events: rule.events.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules, ignored: Vec::new() })
    }

    /// Never report paths equal to or below `prefix`.
    pub fn ignore(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !prefix.is_empty() {
            self.ignored.push(prefix);
        }
        self
    }

    /// Ignore what frontpipe itself writes: the output root and both
    /// generated manifests.
    pub fn ignore_outputs(self, cfg: &ConfigFile) -> Self {
        let dest = relative_str(cfg.root(), &cfg.dest_root())
            .unwrap_or_else(|| cfg.dest.root.clone());
        self.ignore(dest)
            .ignore(normalize(&cfg.manifest.style))
            .ignore(normalize(&cfg.manifest.template))
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.ignored.iter().any(|prefix| {
            rel_path == prefix
                || rel_path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Indices (declaration order) of the rules triggered by this change.
    pub fn matching(&self, rel_path: &str, kind: ChangeKind) -> Vec<usize> {
        if self.is_ignored(rel_path) {
            return Vec::new();
        }
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.events.contains(&kind) && rule.set.is_match(rel_path))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn rule_name(&self, index: usize) -> Option<&str> {
        self.rules.get(index).map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
