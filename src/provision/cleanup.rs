//! Cache removal.
//!
//! Nothing here affects correctness of the image; it only reclaims space.
//! Each removal reports through [`CleanupStats`], and the configured
//! [`CleanupPolicy`] decides whether a failed removal aborts the run.

use crate::config::CleanupPolicy;
use crate::error::{ProvisionError, Result};
use crate::shell::Invocation;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the bytecode cache directories Python writes.
pub const BYTECODE_DIR: &str = "__pycache__";

/// A removal that failed under the best-effort policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub message: String,
}

/// What cleanup accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    /// Paths removed (directories or files).
    pub removed: usize,
    /// Bytes of regular files removed.
    pub bytes_freed: u64,
    /// Failures tolerated under the best-effort policy.
    pub failures: Vec<CleanupFailure>,
}

/// Probe printing the interpreter's library directories, one per line.
pub fn library_roots_probe(interpreter: &str) -> Invocation {
    Invocation::new(interpreter).args([
        "-c",
        "import sysconfig; p = sysconfig.get_paths(); print('\\n'.join(p[k] for k in ('stdlib', 'purelib', 'platlib')))",
    ])
}

/// Parse probe output into roots, dropping roots nested inside another.
pub fn parse_library_roots(stdout: &str) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect();
    collapse_roots(roots)
}

/// Sort, dedupe, and drop roots contained in an earlier root.
pub fn collapse_roots(mut roots: Vec<PathBuf>) -> Vec<PathBuf> {
    roots.sort();
    roots.dedup();
    let mut kept: Vec<PathBuf> = Vec::new();
    for root in roots {
        if !kept.iter().any(|k| root.starts_with(k)) {
            kept.push(root);
        }
    }
    kept
}

/// Find every `__pycache__` directory under `root` without descending into them.
///
/// A missing root yields nothing. Unreadable subtrees are returned as failures.
pub fn find_bytecode_dirs(root: &Path) -> (Vec<PathBuf>, Vec<CleanupFailure>) {
    let mut found = Vec::new();
    let mut failures = Vec::new();

    let mut walker = WalkDir::new(root).follow_links(false).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let missing_root = err.depth() == 0
                    && err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::NotFound);
                if !missing_root {
                    failures.push(CleanupFailure {
                        path: err.path().unwrap_or(root).to_path_buf(),
                        message: err.to_string(),
                    });
                }
                continue;
            }
        };

        if entry.file_type().is_dir() && entry.file_name() == BYTECODE_DIR {
            found.push(entry.into_path());
            walker.skip_current_dir();
        }
    }

    (found, failures)
}

/// Remove a file, symlink, or directory tree, returning bytes freed.
///
/// A path that does not exist frees nothing and is not an error.
pub fn remove_path(path: &Path) -> io::Result<u64> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    if meta.is_dir() {
        let size = tree_size(path);
        fs::remove_dir_all(path)?;
        Ok(size)
    } else {
        fs::remove_file(path)?;
        Ok(if meta.is_file() { meta.len() } else { 0 })
    }
}

fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Applies the policy to every removal and accumulates statistics.
#[derive(Debug)]
pub struct Cleaner<'a> {
    policy: CleanupPolicy,
    stats: &'a mut CleanupStats,
}

impl<'a> Cleaner<'a> {
    pub fn new(policy: CleanupPolicy, stats: &'a mut CleanupStats) -> Self {
        Self { policy, stats }
    }

    /// Record a failure; fatal only under the strict policy.
    pub fn fail(&mut self, path: &Path, message: String) -> Result<()> {
        match self.policy {
            CleanupPolicy::Strict => Err(ProvisionError::CleanupFailed {
                path: path.to_path_buf(),
                message,
            }),
            CleanupPolicy::BestEffort => {
                tracing::warn!("Could not remove {}: {}", path.display(), message);
                self.stats.failures.push(CleanupFailure {
                    path: path.to_path_buf(),
                    message,
                });
                Ok(())
            }
        }
    }

    /// Remove one path.
    pub fn remove(&mut self, path: &Path) -> Result<()> {
        match remove_path(path) {
            Ok(freed) => {
                tracing::debug!("Removed {} ({} bytes)", path.display(), freed);
                self.stats.removed += 1;
                self.stats.bytes_freed += freed;
                Ok(())
            }
            Err(e) => self.fail(path, e.to_string()),
        }
    }

    /// Remove a directory tree if it exists.
    pub fn remove_dir(&mut self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(_) => self.remove(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist, nothing to remove", path.display());
                Ok(())
            }
            Err(e) => self.fail(path, e.to_string()),
        }
    }

    /// Remove everything inside `dir`, keeping `dir` itself.
    pub fn purge_contents(&mut self, dir: &Path) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist, nothing to purge", dir.display());
                return Ok(());
            }
            Err(e) => return self.fail(dir, e.to_string()),
        };

        for entry in entries {
            match entry {
                Ok(entry) => self.remove(&entry.path())?,
                Err(e) => self.fail(dir, e.to_string())?,
            }
        }
        Ok(())
    }

    /// Remove every bytecode cache directory under the roots.
    pub fn remove_bytecode(&mut self, roots: &[PathBuf]) -> Result<()> {
        for root in roots {
            let (dirs, failures) = find_bytecode_dirs(root);
            tracing::debug!(
                "Found {} {} directories under {}",
                dirs.len(),
                BYTECODE_DIR,
                root.display()
            );
            for failure in failures {
                self.fail(&failure.path, failure.message)?;
            }
            for dir in dirs {
                self.remove(&dir)?;
            }
        }
        Ok(())
    }
}
