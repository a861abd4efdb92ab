// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::env::EnvOverrides;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::validate::validate_output_root;
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// A missing file yields the defaults; any other read error, or a TOML
/// error, is returned. No semantic validation happens here.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = ?path, "no config file; using the conventional layout");
            return Ok(RawConfigFile::default());
        }
        Err(err) => return Err(err.into()),
    };

    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load, apply environment overrides and validate.
///
/// Relative paths in the result are anchored at the config file's directory.
pub fn load_and_validate(path: impl AsRef<Path>, env: &EnvOverrides) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw = load_from_path(path)?;
    raw.apply_env(env);
    let config = ConfigFile::try_from(raw)?.with_root(config_root_dir(path));
    validate_output_root(&config)?;
    Ok(config)
}

/// Project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/Frontpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Frontpipe.toml" (parent = ""),
///   we fall back to the current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
