#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use frontpipe::config::{ConfigFile, RawConfigFile};
use frontpipe::types::BuildMode;
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_dest(mut self, root: &str) -> Self {
        self.config.dest.root = root.to_string();
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn with_style_before(mut self, entries: &[&str]) -> Self {
        self.config.manifest.style_before = entries.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replace all three tool commands at once.
    pub fn with_tools(mut self, templates: &str, styles: &str, scripts: &str) -> Self {
        self.config.tools.templates = templates.to_string();
        self.config.tools.styles = styles.to_string();
        self.config.tools.scripts = scripts.to_string();
        self
    }

    pub fn with_asset(mut self, pattern: &str, dest_subdir: &str) -> Self {
        self.config
            .assets
            .insert(pattern.to_string(), dest_subdir.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    pub fn build_at(self, root: &Path) -> Arc<ConfigFile> {
        Arc::new(self.build().with_root(root))
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project directory.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Empty project with an existing `src/`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp project");
        fs::create_dir_all(dir.path().join("src")).expect("create src");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file, creating parent directories.
    pub fn file(&self, rel: &str, contents: &str) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write project file");
        self
    }

    pub fn dir(&self, rel: &str) -> &Self {
        fs::create_dir_all(self.path(rel)).expect("create project dir");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read project file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn config(&self, builder: ConfigFileBuilder) -> Arc<ConfigFile> {
        builder.build_at(self.root())
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
