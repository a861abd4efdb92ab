// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::BuildMode;

/// Raw configuration as read from `Frontpipe.toml`.
///
/// Every section is optional; an empty (or missing) file describes the
/// conventional layout:
///
/// ```toml
/// [src]
/// root = "src"
/// blocks = "src/blocks"
///
/// [dest]
/// root = "build"
///
/// [assets]
/// "src/fonts/**/*.{woff,woff2}" = "fonts"
///
/// [manifest]
/// style_before = ["app.scss"]
///
/// [tools]
/// styles = "npx sass {input} {output}"
///
/// [server]
/// port = 8080
///
/// [watch]
/// debounce_ms = 100
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub src: SrcSection,

    #[serde(default)]
    pub dest: DestSection,

    /// Extra files copied verbatim: glob → subdirectory of the output root.
    #[serde(default = "default_assets")]
    pub assets: BTreeMap<String, String>,

    #[serde(default)]
    pub manifest: ManifestSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// Not read from TOML; set from `NODE_ENV` by [`RawConfigFile::apply_env`].
    #[serde(skip)]
    pub mode: BuildMode,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            src: SrcSection::default(),
            dest: DestSection::default(),
            assets: default_assets(),
            manifest: ManifestSection::default(),
            tools: ToolsSection::default(),
            server: ServerSection::default(),
            watch: WatchSection::default(),
            mode: BuildMode::default(),
        }
    }
}

fn default_assets() -> BTreeMap<String, String> {
    let mut assets = BTreeMap::new();
    assets.insert("src/fonts/**/*.{woff,woff2}".to_string(), "fonts".to_string());
    assets
}

/// `[src]` section: where sources live, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SrcSection {
    pub root: String,
    /// Component directories (`<name>/<name>.scss`, `<name>/<name>.pug`, ...).
    pub blocks: String,
    /// Page templates; each compiles to one HTML file.
    pub pages: String,
    /// Shared template partials and mixins.
    pub pug: String,
    pub scss: String,
    pub js: String,
    pub img: String,
    /// Single SVG icons merged into the sprite.
    pub icons: String,
}

impl Default for SrcSection {
    fn default() -> Self {
        Self {
            root: "src".to_string(),
            blocks: "src/blocks".to_string(),
            pages: "src/pages".to_string(),
            pug: "src/pug".to_string(),
            scss: "src/scss".to_string(),
            js: "src/js".to_string(),
            img: "src/img".to_string(),
            icons: "src/icons".to_string(),
        }
    }
}

/// `[dest]` section. `root` is relative to the project root (or absolute);
/// the per-kind folders are relative to `root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DestSection {
    pub root: String,
    pub html: String,
    pub css: String,
    pub js: String,
    pub img: String,
}

impl Default for DestSection {
    fn default() -> Self {
        Self {
            root: "build".to_string(),
            html: String::new(),
            css: "css".to_string(),
            js: "js".to_string(),
            img: "img".to_string(),
        }
    }
}

/// `[manifest]` section: the two generated import/include files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestSection {
    /// Generated style manifest, compiled as the style entry by default.
    pub style: String,
    /// Generated template manifest with one `include` per component.
    pub template: String,
    /// Path from the style manifest to the component root.
    pub style_import_prefix: String,
    /// Path from the template manifest to the component root.
    pub template_include_prefix: String,
    /// Entries placed before the scanned components, in this order.
    pub style_before: Vec<String>,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            style: "src/scss/style.scss".to_string(),
            template: "src/pug/mixins.pug".to_string(),
            style_import_prefix: "../blocks/".to_string(),
            template_include_prefix: "../blocks/".to_string(),
            style_before: vec!["app.scss".to_string()],
        }
    }
}

/// `[tools]` section: shell command templates for the external compilers.
///
/// Placeholders: `{input}`, `{output}`, `{output_dir}`, `{mode}`.
/// A tool set to an empty string is disabled; its task is skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub templates: String,
    pub styles: String,
    pub scripts: String,
    /// Style entry compiled by `compile-styles`.
    pub style_entry: String,
    /// Script entry bundled by `bundle-scripts`.
    pub script_entry: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            templates: "npx pug {input} --out {output_dir} --pretty".to_string(),
            styles: "npx sass {input} {output}".to_string(),
            scripts: "npx esbuild {input} --bundle --outfile={output}".to_string(),
            style_entry: "src/scss/style.scss".to_string(),
            script_entry: "src/js/app.js".to_string(),
        }
    }
}

impl ToolsSection {
    /// Returns the command template, or `None` when the tool is disabled.
    pub fn command(template: &str) -> Option<&str> {
        let trimmed = template.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }
}

/// `[server]` section for the development server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Page served for `/`.
    pub start_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            start_path: "index.html".to_string(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiet period after the last event before a rebuild starts.
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// One `[assets]` entry after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRule {
    pub pattern: String,
    pub dest_subdir: String,
}

/// Validated configuration anchored at a project root.
///
/// Source and destination paths stay relative (as written in the file) so
/// that they double as glob prefixes; use [`ConfigFile::path`] to touch the
/// filesystem.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: PathBuf,
    pub mode: BuildMode,
    pub src: SrcSection,
    pub dest: DestSection,
    pub assets: Vec<AssetRule>,
    pub manifest: ManifestSection,
    pub tools: ToolsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    /// Construct without validation. Only for use after `validate_raw_config`
    /// succeeded.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let assets = raw
            .assets
            .into_iter()
            .map(|(pattern, dest_subdir)| AssetRule {
                pattern: normalize(&pattern),
                dest_subdir: normalize(&dest_subdir),
            })
            .collect();

        let src = raw.src;
        let src = SrcSection {
            root: normalize(&src.root),
            blocks: normalize(&src.blocks),
            pages: normalize(&src.pages),
            pug: normalize(&src.pug),
            scss: normalize(&src.scss),
            js: normalize(&src.js),
            img: normalize(&src.img),
            icons: normalize(&src.icons),
        };
        let dest = raw.dest;
        let dest = DestSection {
            root: normalize(&dest.root),
            html: normalize(&dest.html),
            css: normalize(&dest.css),
            js: normalize(&dest.js),
            img: normalize(&dest.img),
        };

        Self {
            root: PathBuf::from("."),
            mode: raw.mode,
            src,
            dest,
            assets,
            manifest: raw.manifest,
            tools: raw.tools,
            server: raw.server,
            watch: raw.watch,
        }
    }

    /// Anchor relative paths at `root` (usually the config file's directory).
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Project root all relative paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a project-relative path. Absolute paths are returned as-is.
    pub fn path(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            return self.root.clone();
        }
        self.root.join(rel)
    }

    pub fn dest_root(&self) -> PathBuf {
        self.path(&self.dest.root)
    }

    /// Resolve one of the per-kind output folders below the output root.
    pub fn dest_dir(&self, sub: &str) -> PathBuf {
        let root = self.dest_root();
        if sub.is_empty() { root } else { root.join(sub) }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }
}

/// Strip `./` prefixes and trailing slashes, use forward slashes.
pub(crate) fn normalize(p: &str) -> String {
    let mut s = p.trim().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    while s.len() > 1 && s.ends_with('/') {
        s.pop();
    }
    s
}
