// src/tasks/tracker.rs

//! Content-hash bookkeeping for the "changed only" tasks.
//!
//! Hashes live in memory for the lifetime of the process; a fresh process
//! treats every file as changed.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last processed hash per source file.
#[derive(Debug, Default, Clone)]
pub struct ChangeTracker {
    hashes: HashMap<PathBuf, String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` with content `hash` differs from what was last recorded.
    pub fn is_changed(&self, path: &Path, hash: &str) -> bool {
        self.hashes.get(path).map(String::as_str) != Some(hash)
    }

    pub fn record(&mut self, path: impl Into<PathBuf>, hash: impl Into<String>) {
        self.hashes.insert(path.into(), hash.into());
    }

    /// Drop entries for files that are no longer among `present`.
    pub fn retain_present<'a, I>(&mut self, present: I)
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let keep: Vec<&Path> = present.into_iter().collect();
        let before = self.hashes.len();
        self.hashes.retain(|p, _| keep.contains(&p.as_path()));
        if self.hashes.len() < before {
            debug!(removed = before - self.hashes.len(), "pruned stale file hashes");
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
