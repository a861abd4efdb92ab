// src/tasks/executor.rs

//! Task execution.
//!
//! The runner and the dispatcher talk to a [`TaskExecutor`] instead of
//! calling task code directly. This makes it easy to swap in a fake executor
//! in tests while keeping the production implementation in
//! [`BuildExecutor`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::config::{ConfigFile, ToolsSection};
use crate::fs::glob::{collect_matching, MatchedFile};
use crate::fs::{FileSystem, RealFileSystem};
use crate::manifest::{regenerate, ManifestKind, ManifestSpec, ManifestState, WriteOutcome};

use super::tool::{run_tool, ToolInvocation};
use super::tracker::{compute_file_hash, ChangeTracker};
use super::{files, sprite, TaskId, TaskOutcome, IMAGE_EXTENSIONS, SPRITE_FILE};

/// Trait abstracting how a single task is carried out.
///
/// Production code uses [`BuildExecutor`]; tests can provide their own
/// implementation that doesn't touch the filesystem or spawn processes.
pub trait TaskExecutor: Send + Sync {
    /// Run one task to completion. Failures are reported through the
    /// outcome, never as a panic or error.
    fn run(&self, task: TaskId) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>>;
}

#[derive(Debug, Default)]
struct ManifestStates {
    style: ManifestState,
    template: ManifestState,
}

/// Executor that performs the real build steps.
///
/// Owns the state that successive runs depend on: the previous manifest
/// entries and the content hashes of copied images and compiled pages.
#[derive(Debug)]
pub struct BuildExecutor {
    cfg: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
    manifests: Arc<Mutex<ManifestStates>>,
    images: Arc<Mutex<ChangeTracker>>,
    /// Shared by both template tasks: a full compile refreshes it so the
    /// next incremental compile only picks up real edits.
    pages: tokio::sync::Mutex<ChangeTracker>,
}

impl BuildExecutor {
    pub fn new(cfg: Arc<ConfigFile>) -> Self {
        Self::with_fs(cfg, Arc::new(RealFileSystem))
    }

    pub fn with_fs(cfg: Arc<ConfigFile>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            cfg,
            fs,
            manifests: Arc::new(Mutex::new(ManifestStates::default())),
            images: Arc::new(Mutex::new(ChangeTracker::new())),
            pages: tokio::sync::Mutex::new(ChangeTracker::new()),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    async fn execute(&self, task: TaskId) -> Result<TaskOutcome> {
        match task {
            TaskId::ClearOutput => self.clear_output().await,
            TaskId::WriteManifests => self.write_manifests().await,
            TaskId::CopyStaticAssets => self.copy_static_assets().await,
            TaskId::GenerateIconSprite => self.generate_icon_sprite().await,
            TaskId::CopyImages => self.copy_images().await,
            TaskId::CompileTemplates => self.compile_templates(false).await,
            TaskId::CompileChangedTemplates => self.compile_templates(true).await,
            TaskId::CompileStyles => {
                let cfg = &self.cfg;
                self.compile_entry(
                    TaskId::CompileStyles,
                    &cfg.tools.styles,
                    &cfg.tools.style_entry,
                    &cfg.dest.css,
                    "css",
                )
                .await
            }
            TaskId::BundleScripts => {
                let cfg = &self.cfg;
                self.compile_entry(
                    TaskId::BundleScripts,
                    &cfg.tools.scripts,
                    &cfg.tools.script_entry,
                    &cfg.dest.js,
                    "js",
                )
                .await
            }
        }
    }

    async fn clear_output(&self) -> Result<TaskOutcome> {
        let dest = self.cfg.dest_root();
        let removed = blocking(move || files::clear_dir_contents(&dest)).await?;
        Ok(TaskOutcome::success(format!("removed {removed} entries")))
    }

    fn manifest_specs(&self) -> (ManifestSpec, ManifestSpec) {
        let cfg = &self.cfg;
        let component_root = cfg.path(&cfg.src.blocks);
        let style = ManifestSpec {
            kind: ManifestKind::Style,
            component_root: component_root.clone(),
            output: cfg.path(&cfg.manifest.style),
            import_prefix: cfg.manifest.style_import_prefix.clone(),
            prefix_entries: cfg.manifest.style_before.clone(),
        };
        let template = ManifestSpec {
            kind: ManifestKind::Template,
            component_root,
            output: cfg.path(&cfg.manifest.template),
            import_prefix: cfg.manifest.template_include_prefix.clone(),
            prefix_entries: Vec::new(),
        };
        (style, template)
    }

    async fn write_manifests(&self) -> Result<TaskOutcome> {
        let (style_spec, template_spec) = self.manifest_specs();
        let fs = Arc::clone(&self.fs);
        let states = Arc::clone(&self.manifests);

        let (style, template) = blocking(move || {
            let mut states = states
                .lock()
                .map_err(|_| anyhow!("manifest state lock poisoned"))?;
            let (next_style, style) = regenerate(fs.as_ref(), &style_spec, &states.style)?;
            states.style = next_style;
            let (next_template, template) =
                regenerate(fs.as_ref(), &template_spec, &states.template)?;
            states.template = next_template;
            Ok((style, template))
        })
        .await?;

        let describe = |outcome: &WriteOutcome| match outcome {
            WriteOutcome::Unchanged => "unchanged".to_string(),
            WriteOutcome::Written { added, removed } => {
                format!("+{} -{}", added.len(), removed.len())
            }
        };
        Ok(TaskOutcome::success(format!(
            "styles {}, templates {}",
            describe(&style),
            describe(&template)
        )))
    }

    async fn copy_static_assets(&self) -> Result<TaskOutcome> {
        if self.cfg.assets.is_empty() {
            return Ok(TaskOutcome::skipped("no [assets] configured"));
        }
        let root = self.cfg.root().to_path_buf();
        let rules = self.cfg.assets.clone();
        let dest = self.cfg.dest_root();
        let copied = blocking(move || files::copy_assets(&root, &rules, &dest)).await?;
        Ok(TaskOutcome::success(format!("copied {copied} files")))
    }

    async fn generate_icon_sprite(&self) -> Result<TaskOutcome> {
        let icons = self.cfg.path(&self.cfg.src.icons);
        let output = self.cfg.dest_dir(&self.cfg.dest.img).join(SPRITE_FILE);
        let missing = icons.clone();

        match blocking(move || sprite::generate_sprite(&icons, &output)).await? {
            Some(count) => Ok(TaskOutcome::success(format!("{count} icons"))),
            None => Ok(TaskOutcome::skipped(format!(
                "no icon directory at {}",
                missing.display()
            ))),
        }
    }

    async fn copy_images(&self) -> Result<TaskOutcome> {
        let cfg = &self.cfg;
        let src = cfg.path(&cfg.src.img);
        if !self.fs.is_dir(&src) {
            return Ok(TaskOutcome::skipped(format!("no image directory at {}", src.display())));
        }

        let root = cfg.root().to_path_buf();
        let pattern = format!("{}/**/*.{}", cfg.src.img, IMAGE_EXTENSIONS);
        let dest = cfg.dest_dir(&cfg.dest.img);
        let tracker = Arc::clone(&self.images);

        let report = blocking(move || {
            let mut tracker = tracker
                .lock()
                .map_err(|_| anyhow!("image tracker lock poisoned"))?;
            files::copy_changed(&root, &pattern, &dest, &mut tracker)
        })
        .await?;

        Ok(TaskOutcome::success(format!(
            "copied {}, unchanged {}",
            report.copied, report.unchanged
        )))
    }

    async fn compile_templates(&self, changed_only: bool) -> Result<TaskOutcome> {
        let task = if changed_only {
            TaskId::CompileChangedTemplates
        } else {
            TaskId::CompileTemplates
        };
        let cfg = &self.cfg;
        let Some(template) = ToolsSection::command(&cfg.tools.templates) else {
            return Ok(TaskOutcome::skipped("template tool disabled"));
        };

        let root = cfg.root().to_path_buf();
        let pattern = format!("{}/**/*.pug", cfg.src.pages);
        let pages: Vec<(MatchedFile, String)> = blocking(move || {
            collect_matching(&root, &pattern)?
                .into_iter()
                .map(|m| {
                    let hash = compute_file_hash(&m.path)?;
                    Ok::<_, anyhow::Error>((m, hash))
                })
                .collect()
        })
        .await?;

        if pages.is_empty() {
            return Ok(TaskOutcome::skipped("no pages to compile"));
        }

        let mut tracker = self.pages.lock().await;
        tracker.retain_present(pages.iter().map(|(m, _)| m.path.as_path()));

        let html_root = cfg.dest_dir(&cfg.dest.html);
        let mut compiled = 0;
        for (page, hash) in &pages {
            if changed_only && !tracker.is_changed(&page.path, hash) {
                debug!(task = %task, page = ?page.path, "page unchanged; skipping");
                continue;
            }

            let output = html_root.join(&page.below_base).with_extension("html");
            let output_dir = output.parent().map(Path::to_path_buf).unwrap_or_else(|| html_root.clone());
            let input = self.tool_path(&page.path);
            let output = self.tool_path(&output);
            let output_dir = self.tool_path(&output_dir);

            let outcome = run_tool(&ToolInvocation {
                task,
                template,
                input: &input,
                output: &output,
                output_dir: &output_dir,
                mode: cfg.mode,
                cwd: cfg.root(),
            })
            .await;
            if outcome.is_failure() {
                return Ok(outcome);
            }
            tracker.record(page.path.clone(), hash.clone());
            compiled += 1;
        }

        Ok(TaskOutcome::success(format!("compiled {compiled} of {} pages", pages.len())))
    }

    async fn compile_entry(
        &self,
        task: TaskId,
        tool: &str,
        entry: &str,
        dest_sub: &str,
        extension: &str,
    ) -> Result<TaskOutcome> {
        let Some(template) = ToolsSection::command(tool) else {
            return Ok(TaskOutcome::skipped(format!("tool for {task} disabled")));
        };

        let entry_path = self.cfg.path(entry);
        if !self.fs.is_file(&entry_path) {
            return Ok(TaskOutcome::skipped(format!("no entry at {}", entry_path.display())));
        }

        let stem = entry_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| task.to_string());
        let output_dir = self.cfg.dest_dir(dest_sub);
        let output = output_dir.join(format!("{stem}.{extension}"));

        let input = self.tool_path(&entry_path);
        let output = self.tool_path(&output);
        let output_dir = self.tool_path(&output_dir);

        Ok(run_tool(&ToolInvocation {
            task,
            template,
            input: &input,
            output: &output,
            output_dir: &output_dir,
            mode: self.cfg.mode,
            cwd: self.cfg.root(),
        })
        .await)
    }

    /// Paths handed to tools are relative to the project root, which is
    /// also the tool's working directory.
    fn tool_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.cfg.root())
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl TaskExecutor for BuildExecutor {
    fn run(&self, task: TaskId) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        Box::pin(async move {
            match self.execute(task).await {
                Ok(outcome) => outcome,
                Err(err) => TaskOutcome::failed(format!("{err:#}")),
            }
        })
    }
}

/// Run blocking file work off the async threads.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("blocking task panicked: {e}"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use std::fs;
    use tempfile::tempdir;

    fn config_at(root: &Path, edit: impl FnOnce(&mut RawConfigFile)) -> Arc<ConfigFile> {
        let mut raw = RawConfigFile::default();
        edit(&mut raw);
        Arc::new(ConfigFile::try_from(raw).unwrap().with_root(root))
    }

    #[tokio::test]
    async fn missing_icons_are_skipped() {
        let dir = tempdir().unwrap();
        let exec = BuildExecutor::new(config_at(dir.path(), |_| {}));

        let outcome = exec.run(TaskId::GenerateIconSprite).await;
        assert!(matches!(outcome, TaskOutcome::Skipped { .. }), "{outcome:?}");
        assert!(!dir.path().join("build/img/sprite.svg").exists());
    }

    #[tokio::test]
    async fn disabled_style_tool_is_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/scss")).unwrap();
        fs::write(dir.path().join("src/scss/style.scss"), "").unwrap();
        let exec = BuildExecutor::new(config_at(dir.path(), |raw| raw.tools.styles = String::new()));

        let outcome = exec.run(TaskId::CompileStyles).await;
        assert!(matches!(outcome, TaskOutcome::Skipped { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn manifests_are_written_once_for_an_unchanged_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/blocks/button")).unwrap();
        fs::write(root.join("src/blocks/button/button.scss"), "").unwrap();
        fs::write(root.join("src/blocks/button/button.pug"), "").unwrap();
        let exec = BuildExecutor::new(config_at(root, |_| {}));

        let first = exec.run(TaskId::WriteManifests).await;
        assert_eq!(first, TaskOutcome::success("styles +2 -0, templates +1 -0"));
        let style = fs::read_to_string(root.join("src/scss/style.scss")).unwrap();
        assert!(style.contains("@import \"../blocks/button/button.scss\";"));

        let second = exec.run(TaskId::WriteManifests).await;
        assert_eq!(second, TaskOutcome::success("styles unchanged, templates unchanged"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn changed_templates_only_recompile_edited_pages() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/pages")).unwrap();
        fs::write(root.join("src/pages/index.pug"), "p one").unwrap();
        fs::write(root.join("src/pages/about.pug"), "p two").unwrap();
        let exec = BuildExecutor::new(config_at(root, |raw| {
            raw.tools.templates = "mkdir -p {output_dir} && cp {input} {output}".to_string();
        }));

        let full = exec.run(TaskId::CompileTemplates).await;
        assert_eq!(full, TaskOutcome::success("compiled 2 of 2 pages"));
        assert!(root.join("build/index.html").is_file());

        let none = exec.run(TaskId::CompileChangedTemplates).await;
        assert_eq!(none, TaskOutcome::success("compiled 0 of 2 pages"));

        fs::write(root.join("src/pages/about.pug"), "p three").unwrap();
        let one = exec.run(TaskId::CompileChangedTemplates).await;
        assert_eq!(one, TaskOutcome::success("compiled 1 of 2 pages"));
        assert_eq!(fs::read_to_string(root.join("build/about.html")).unwrap(), "p three");
    }
}
