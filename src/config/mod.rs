// src/config/mod.rs

//! Configuration loading and validation for frontpipe.
//!
//! - `model.rs`: the TOML-backed data model and the validated `ConfigFile`.
//! - `loader.rs`: reading the file (missing file → defaults).
//! - `env.rs`: `NODE_ENV` / `DEST` overrides.
//! - `validate.rs`: path, asset, server and watch sanity checks.

pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::{EnvOverrides, DEST_VAR, MODE_VAR};
pub use loader::{config_root_dir, load_and_validate, load_from_path};
pub use model::{
    AssetRule, ConfigFile, DestSection, ManifestSection, RawConfigFile, ServerSection,
    SrcSection, ToolsSection, WatchSection,
};
pub use validate::{validate_output_root, validate_source_root};
