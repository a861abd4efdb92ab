// src/watch/rules.rs

//! Static watch rules.
//!
//! A rule ties a set of source globs and event kinds to a pipeline of task
//! stages. Rules are declared once at startup from the configured paths; the
//! declaration order is also the order in which triggered rules run.

use crate::config::ConfigFile;
use crate::dag::Stage;
use crate::tasks::{TaskId, IMAGE_EXTENSIONS};
use crate::types::ChangeKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRule {
    pub name: String,
    /// Project-relative globs.
    pub globs: Vec<String>,
    pub events: Vec<ChangeKind>,
    pub pipeline: Vec<Stage>,
    /// Fire the dev server reload once the pipeline finished.
    pub reload: bool,
}

impl WatchRule {
    pub fn new(name: impl Into<String>, globs: Vec<String>, events: &[ChangeKind]) -> Self {
        Self {
            name: name.into(),
            globs,
            events: events.to_vec(),
            pipeline: Vec::new(),
            reload: true,
        }
    }

    pub fn stage(mut self, tasks: &[TaskId]) -> Self {
        self.pipeline.push(tasks.to_vec());
        self
    }

    pub fn without_reload(mut self) -> Self {
        self.reload = false;
        self
    }

    pub fn accepts(&self, kind: ChangeKind) -> bool {
        self.events.contains(&kind)
    }
}

/// The rule table used by `develop`.
pub fn default_rules(cfg: &ConfigFile) -> Vec<WatchRule> {
    let src = &cfg.src;
    let all = &ChangeKind::ALL;

    vec![
        WatchRule::new(
            "pages",
            vec![format!("{}/**/*.pug", src.pages)],
            &[ChangeKind::Create, ChangeKind::Change],
        )
        .stage(&[TaskId::CompileChangedTemplates])
        .stage(&[TaskId::CompileStyles, TaskId::BundleScripts]),
        WatchRule::new(
            "templates",
            vec![format!("{}/**/*.pug", src.pug), format!("{}/**/*.pug", src.blocks)],
            all,
        )
        .stage(&[TaskId::WriteManifests])
        .stage(&[TaskId::CompileTemplates])
        .stage(&[TaskId::CompileStyles, TaskId::BundleScripts]),
        WatchRule::new(
            "images",
            vec![format!("{}/**/*.{}", src.img, IMAGE_EXTENSIONS)],
            all,
        )
        .stage(&[TaskId::CopyImages]),
        WatchRule::new(
            "scripts",
            vec![format!("{}/**/*.js", src.js), format!("{}/**/*.js", src.blocks)],
            all,
        )
        .stage(&[TaskId::BundleScripts]),
        WatchRule::new(
            "styles",
            vec![
                format!("{}/**/*.{{sass,scss}}", src.scss),
                format!("{}/**/*.{{sass,scss}}", src.blocks),
            ],
            all,
        )
        .stage(&[TaskId::WriteManifests])
        .stage(&[TaskId::CompileStyles]),
        WatchRule::new("icons", vec![format!("{}/*.svg", src.icons)], all)
            .stage(&[TaskId::GenerateIconSprite])
            .stage(&[TaskId::CopyImages]),
    ]
}
