// src/tasks/mod.rs

//! Task registry: the fixed set of named build steps.
//!
//! Each task has a static [`TaskSpec`] derived from the configuration (input
//! globs, claimed outputs, whether it is destructive) and is executed by a
//! [`TaskExecutor`]. The production executor is [`BuildExecutor`]; tests swap
//! in a fake that records what ran.
//!
//! - [`tool`] runs the external compilers.
//! - [`files`] does the in-process copying and clearing.
//! - [`sprite`] assembles the icon sprite.
//! - [`tracker`] remembers content hashes for the "changed only" tasks.

pub mod executor;
pub mod files;
pub mod sprite;
pub mod tool;
pub mod tracker;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::ConfigFile;

pub use executor::{BuildExecutor, TaskExecutor};

/// Image extensions picked up by `copy-images` and the `images` watch rule.
pub const IMAGE_EXTENSIONS: &str = "{jpg,jpeg,png,gif,svg,webp}";

/// File name of the generated sprite inside the image output folder.
pub const SPRITE_FILE: &str = "sprite.svg";

/// Identifier of a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    ClearOutput,
    WriteManifests,
    CopyStaticAssets,
    GenerateIconSprite,
    CopyImages,
    CompileTemplates,
    CompileChangedTemplates,
    CompileStyles,
    BundleScripts,
}

impl TaskId {
    pub const ALL: [TaskId; 9] = [
        TaskId::ClearOutput,
        TaskId::WriteManifests,
        TaskId::CopyStaticAssets,
        TaskId::GenerateIconSprite,
        TaskId::CopyImages,
        TaskId::CompileTemplates,
        TaskId::CompileChangedTemplates,
        TaskId::CompileStyles,
        TaskId::BundleScripts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskId::ClearOutput => "clear-output",
            TaskId::WriteManifests => "write-manifests",
            TaskId::CopyStaticAssets => "copy-static-assets",
            TaskId::GenerateIconSprite => "generate-icon-sprite",
            TaskId::CopyImages => "copy-images",
            TaskId::CompileTemplates => "compile-templates",
            TaskId::CompileChangedTemplates => "compile-changed-templates",
            TaskId::CompileStyles => "compile-styles",
            TaskId::BundleScripts => "bundle-scripts",
        }
    }

    pub fn kind(self) -> TaskKind {
        match self {
            TaskId::ClearOutput => TaskKind::Destructive,
            _ => TaskKind::Rerunnable,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TaskId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown task: {s}"))
    }
}

/// Whether a task can be re-run freely or wipes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Rerunnable,
    Destructive,
}

/// Result of one task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success { summary: String },
    /// Nothing to do (missing optional input, disabled tool). Not an error.
    Skipped { reason: String },
    Failed { message: String },
}

impl TaskOutcome {
    pub fn success(summary: impl Into<String>) -> Self {
        TaskOutcome::Success { summary: summary.into() }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        TaskOutcome::Skipped { reason: reason.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        TaskOutcome::Failed { message: message.into() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }
}

/// Part of the tree a task writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputClaim {
    /// A single file.
    File(PathBuf),
    /// Everything below a directory.
    Tree(PathBuf),
    /// Files with one extension below a directory.
    Files { dir: PathBuf, extension: String },
}

impl OutputClaim {
    /// Conservative overlap test between two claims.
    ///
    /// A `Files` claim only conflicts with trees that contain its directory;
    /// sibling trees below it are assumed to hold other kinds of files.
    pub fn overlaps(&self, other: &OutputClaim) -> bool {
        use OutputClaim::*;
        match (self, other) {
            (File(a), File(b)) => a == b,
            (Tree(t), File(f)) | (File(f), Tree(t)) => f.starts_with(t),
            (Tree(a), Tree(b)) => a.starts_with(b) || b.starts_with(a),
            (Files { dir, .. }, Tree(t)) | (Tree(t), Files { dir, .. }) => dir.starts_with(t),
            (Files { dir, extension }, File(f)) | (File(f), Files { dir, extension }) => {
                f.starts_with(dir) && has_extension(f, extension)
            }
            (Files { dir: a, extension: ea }, Files { dir: b, extension: eb }) => {
                ea == eb && (a.starts_with(b) || b.starts_with(a))
            }
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Static declaration of a task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: TaskId,
    /// Input globs, relative to the project root.
    pub inputs: Vec<String>,
    pub outputs: Vec<OutputClaim>,
}

/// All task declarations for one configuration.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: BTreeMap<TaskId, TaskSpec>,
}

impl Registry {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let src = &cfg.src;
        let dest_root = cfg.dest_root();
        let img_out = cfg.dest_dir(&cfg.dest.img);
        let pages = format!("{}/**/*.pug", src.pages);

        let mut specs = BTreeMap::new();
        let mut add = |id: TaskId, inputs: Vec<String>, outputs: Vec<OutputClaim>| {
            specs.insert(id, TaskSpec { id, inputs, outputs });
        };

        add(TaskId::ClearOutput, Vec::new(), vec![OutputClaim::Tree(dest_root.clone())]);
        add(
            TaskId::WriteManifests,
            vec![format!("{}/*/*.{{scss,sass,pug}}", src.blocks)],
            vec![
                OutputClaim::File(cfg.path(&cfg.manifest.style)),
                OutputClaim::File(cfg.path(&cfg.manifest.template)),
            ],
        );
        add(
            TaskId::CopyStaticAssets,
            cfg.assets.iter().map(|a| a.pattern.clone()).collect(),
            cfg.assets
                .iter()
                .map(|a| OutputClaim::Tree(cfg.dest_dir(&a.dest_subdir)))
                .collect(),
        );
        add(
            TaskId::GenerateIconSprite,
            vec![format!("{}/*.svg", src.icons)],
            vec![OutputClaim::File(img_out.join(SPRITE_FILE))],
        );
        add(
            TaskId::CopyImages,
            vec![format!("{}/**/*.{}", src.img, IMAGE_EXTENSIONS)],
            vec![OutputClaim::Tree(img_out)],
        );
        let html = OutputClaim::Files {
            dir: cfg.dest_dir(&cfg.dest.html),
            extension: "html".to_string(),
        };
        add(TaskId::CompileTemplates, vec![pages.clone()], vec![html.clone()]);
        add(TaskId::CompileChangedTemplates, vec![pages], vec![html]);
        add(
            TaskId::CompileStyles,
            vec![cfg.tools.style_entry.clone()],
            vec![OutputClaim::Files {
                dir: cfg.dest_dir(&cfg.dest.css),
                extension: "css".to_string(),
            }],
        );
        add(
            TaskId::BundleScripts,
            vec![cfg.tools.script_entry.clone()],
            vec![OutputClaim::Files {
                dir: cfg.dest_dir(&cfg.dest.js),
                extension: "js".to_string(),
            }],
        );

        Self { specs }
    }

    pub fn get(&self, id: TaskId) -> &TaskSpec {
        // Every TaskId is inserted by `from_config`.
        &self.specs[&id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSpec> {
        self.specs.values()
    }
}
