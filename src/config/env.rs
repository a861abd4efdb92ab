// src/config/env.rs

//! Process-environment overrides, read once at startup.
//!
//! - `NODE_ENV=production` switches to production mode (anything else is
//!   development, as the tool chain expects).
//! - `DEST=<path>` replaces `[dest].root`.

use tracing::warn;

use crate::config::model::RawConfigFile;
use crate::types::BuildMode;

pub const MODE_VAR: &str = "NODE_ENV";
pub const DEST_VAR: &str = "DEST";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub mode: BuildMode,
    pub dest: Option<String>,
}

impl EnvOverrides {
    /// Snapshot the relevant variables of the current process.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build overrides from an explicit list of variables (tests use this).
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut out = EnvOverrides::default();

        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                MODE_VAR => {
                    out.mode = value.parse().unwrap_or_else(|e: String| {
                        warn!(value = %value, error = %e, "unrecognised NODE_ENV; using development");
                        BuildMode::Development
                    });
                }
                DEST_VAR if !value.trim().is_empty() => {
                    out.dest = Some(value.trim().to_string());
                }
                _ => {}
            }
        }

        out
    }
}

impl RawConfigFile {
    /// Layer environment overrides on top of the file contents.
    pub fn apply_env(&mut self, env: &EnvOverrides) {
        self.mode = env.mode;
        if let Some(dest) = &env.dest {
            self.dest.root = dest.clone();
        }
    }
}
