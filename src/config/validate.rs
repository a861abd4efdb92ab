// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{normalize, ConfigFile, RawConfigFile};
use crate::errors::{FrontpipeError, Result};
use crate::fs::FileSystem;

/// Upper bound for `[watch].debounce_ms`; anything longer feels broken.
pub const MAX_DEBOUNCE_MS: u64 = 10_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FrontpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_assets(cfg)?;
    validate_server(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> FrontpipeError {
    FrontpipeError::Config(msg.into())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let src_root = normalize(&cfg.src.root);
    let dest_root = normalize(&cfg.dest.root);

    if src_root.is_empty() {
        return Err(config_error("[src].root must not be empty"));
    }
    if dest_root.is_empty() || dest_root == "." || dest_root == "/" {
        return Err(config_error(format!(
            "[dest].root must name a dedicated directory (got {:?})",
            cfg.dest.root
        )));
    }

    if Path::new(&dest_root)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(config_error(format!(
            "[dest].root {:?} must not contain `..`",
            cfg.dest.root
        )));
    }

    // clear-output wipes dest.root, so sources and output never nest.
    if Path::new(&src_root).starts_with(&dest_root) {
        return Err(config_error(format!(
            "[dest].root {:?} contains the source root {:?}",
            dest_root, src_root
        )));
    }

    if Path::new(&dest_root).is_relative() && Path::new(&dest_root).starts_with(&src_root) {
        return Err(config_error(format!(
            "[dest].root {:?} lies inside the source root {:?}",
            dest_root, src_root
        )));
    }

    for (name, sub) in [
        ("html", &cfg.dest.html),
        ("css", &cfg.dest.css),
        ("js", &cfg.dest.js),
        ("img", &cfg.dest.img),
    ] {
        ensure_inside(sub).map_err(|_| {
            config_error(format!("[dest].{name} {:?} must stay inside [dest].root", sub))
        })?;
    }

    Ok(())
}

fn validate_assets(cfg: &RawConfigFile) -> Result<()> {
    for (pattern, dest) in cfg.assets.iter() {
        Glob::new(pattern).map_err(|e| {
            config_error(format!("[assets] invalid glob {:?}: {}", pattern, e))
        })?;
        ensure_inside(dest).map_err(|_| {
            config_error(format!(
                "[assets] destination {:?} for {:?} must stay inside [dest].root",
                dest, pattern
            ))
        })?;
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(config_error("[server].port must be >= 1 (got 0)"));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(config_error("[server].host must not be empty"));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(config_error(format!(
            "[watch].debounce_ms must be <= {} (got {})",
            MAX_DEBOUNCE_MS, cfg.watch.debounce_ms
        )));
    }
    Ok(())
}

/// A relative path with no `..` components and no root.
fn ensure_inside(sub: &str) -> std::result::Result<(), ()> {
    let normalized = normalize(sub);
    let path = Path::new(&normalized);
    let escapes = path.components().any(|c| {
        matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes { Err(()) } else { Ok(()) }
}

/// Check the output root once it is anchored at the project root.
///
/// A relative output root without `..` always stays below the project. An
/// absolute one may point anywhere except at the project root, one of its
/// ancestors, or a directory holding the sources.
pub fn validate_output_root(cfg: &ConfigFile) -> Result<()> {
    let dest = Path::new(&cfg.dest.root);
    if dest.is_relative() {
        return Ok(());
    }

    let project = lexical_absolute(cfg.root())?;
    let dest = lexical_absolute(dest)?;
    let sources = lexical_absolute(&cfg.path(&cfg.src.root))?;

    if project.starts_with(&dest) {
        return Err(config_error(format!(
            "[dest].root {:?} is the project root or one of its ancestors",
            cfg.dest.root
        )));
    }
    if sources.starts_with(&dest) || (sources != project && dest.starts_with(&sources)) {
        return Err(config_error(format!(
            "[dest].root {:?} overlaps the source root {:?}",
            cfg.dest.root, sources
        )));
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` folded away. Symlinks are not
/// followed.
fn lexical_absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Startup check: the source root has to exist before anything runs.
///
/// Everything after startup treats missing inputs as "nothing to do", but a
/// missing source root almost always means the wrong working directory.
pub fn validate_source_root(cfg: &ConfigFile, fs: &dyn FileSystem) -> Result<()> {
    let src_root = cfg.path(&cfg.src.root);
    if !fs.is_dir(&src_root) {
        return Err(config_error(format!(
            "source root {:?} does not exist",
            src_root
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_config_error(raw: RawConfigFile, needle: &str) {
        match ConfigFile::try_from(raw) {
            Err(FrontpipeError::Config(msg)) => {
                assert!(msg.contains(needle), "message {:?} lacks {:?}", msg, needle)
            }
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.dest.root, "build");
        assert_eq!(cfg.assets.len(), 1);
        assert_eq!(cfg.assets[0].dest_subdir, "fonts");
    }

    #[test]
    fn dest_root_may_not_contain_sources() {
        let mut raw = RawConfigFile::default();
        raw.dest.root = "./".to_string();
        expect_config_error(raw, "dedicated directory");

        let mut raw = RawConfigFile::default();
        raw.src.root = "build/src".to_string();
        expect_config_error(raw, "contains the source root");
    }

    #[test]
    fn dest_root_may_not_climb_out_of_the_project() {
        for dest in ["..", "../x", "src/..", "src/../..", "build/../.."] {
            let mut raw = RawConfigFile::default();
            raw.dest.root = dest.to_string();
            expect_config_error(raw, "must not contain `..`");
        }
    }

    #[test]
    fn dest_root_may_not_sit_inside_sources() {
        let mut raw = RawConfigFile::default();
        raw.dest.root = "src/public".to_string();
        expect_config_error(raw, "inside the source root");
    }

    #[cfg(unix)]
    #[test]
    fn absolute_dest_root_may_not_be_an_ancestor_of_the_project() {
        for dest in ["/site", "/", "/site/./"] {
            let mut raw = RawConfigFile::default();
            raw.dest.root = dest.to_string();
            let Ok(cfg) = ConfigFile::try_from(raw) else {
                // "/" is already rejected as not dedicated.
                continue;
            };
            let cfg = cfg.with_root("/site/app");
            let err = validate_output_root(&cfg).unwrap_err();
            assert!(err.to_string().contains("ancestors"), "{err}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn absolute_dest_root_must_not_overlap_sources() {
        let mut raw = RawConfigFile::default();
        raw.dest.root = "/site/src/out".to_string();
        let cfg = ConfigFile::try_from(raw).unwrap().with_root("/site");
        let err = validate_output_root(&cfg).unwrap_err();
        assert!(err.to_string().contains("overlaps the source root"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn absolute_dest_root_elsewhere_is_fine() {
        for dest in ["/site/public", "/srv/www"] {
            let mut raw = RawConfigFile::default();
            raw.dest.root = dest.to_string();
            let cfg = ConfigFile::try_from(raw).unwrap().with_root("/site");
            assert!(validate_output_root(&cfg).is_ok(), "{dest}");
        }
        let cfg = ConfigFile::try_from(RawConfigFile::default())
            .unwrap()
            .with_root("/site");
        assert!(validate_output_root(&cfg).is_ok());
    }

    #[test]
    fn asset_destinations_stay_inside_output() {
        let mut raw = RawConfigFile::default();
        raw.assets.insert("src/misc/*.txt".to_string(), "../outside".to_string());
        expect_config_error(raw, "must stay inside");
    }

    #[test]
    fn rejects_zero_port_and_huge_debounce() {
        let mut raw = RawConfigFile::default();
        raw.server.port = 0;
        expect_config_error(raw, "port");

        let mut raw = RawConfigFile::default();
        raw.watch.debounce_ms = MAX_DEBOUNCE_MS + 1;
        expect_config_error(raw, "debounce_ms");
    }

    #[test]
    fn rejects_bad_asset_glob() {
        let mut raw = RawConfigFile::default();
        raw.assets.insert("src/{fonts".to_string(), "fonts".to_string());
        expect_config_error(raw, "invalid glob");
    }
}
