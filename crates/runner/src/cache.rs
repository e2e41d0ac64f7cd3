//! Cargo home pruning.
//!
//! Between builds only the content addressed parts of `$CARGO_HOME` are worth
//! keeping: installed binaries, the registry index and crate archives, and git
//! databases. Everything else is removed. Pruning is not atomic; an
//! interrupted run leaves a usable tree and can simply be repeated.

use crate::error::{Error, Result};
use std::fs::{self, FileType};
use std::io;
use std::path::{Path, PathBuf};

/// Directories kept at one level of the cache tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLevel {
    /// Directory relative to the cache root, empty for the root itself
    pub dir: &'static str,
    /// Child directory names to keep
    pub retain: &'static [&'static str],
}

/// Level to retain-set table applied by [`CachePruner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRetentionPolicy {
    levels: Vec<RetentionLevel>,
}

impl CacheRetentionPolicy {
    /// Policy from explicit levels, applied in order.
    #[must_use]
    pub fn new(levels: Vec<RetentionLevel>) -> Self {
        Self { levels }
    }

    /// The levels of this policy.
    #[must_use]
    pub fn levels(&self) -> &[RetentionLevel] {
        &self.levels
    }
}

impl Default for CacheRetentionPolicy {
    fn default() -> Self {
        Self::new(vec![
            RetentionLevel {
                dir: "",
                retain: &["bin", "registry", "git"],
            },
            RetentionLevel {
                dir: "registry",
                retain: &["index", "cache"],
            },
            RetentionLevel {
                dir: "git",
                retain: &["db"],
            },
        ])
    }
}

/// Statistics from a prune run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Entries removed (or that would be removed in a dry run)
    pub removed: Vec<PathBuf>,
    /// Entries scanned across all levels
    pub entries_scanned: usize,
}

/// Applies a [`CacheRetentionPolicy`] to a cargo home directory.
#[derive(Debug, Clone)]
pub struct CachePruner {
    root: PathBuf,
    policy: CacheRetentionPolicy,
    dry_run: bool,
}

impl CachePruner {
    /// Pruner for `root` with the default cargo policy.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: CacheRetentionPolicy::default(),
            dry_run: false,
        }
    }

    /// Use a custom policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CacheRetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report what would be removed without deleting anything.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Prune every level of the policy in order.
    ///
    /// A level whose directory is missing is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on the first read or remove failure; entries
    /// removed before the failure stay removed.
    pub fn run(&self) -> Result<PruneStats> {
        let mut stats = PruneStats::default();

        for level in self.policy.levels() {
            let dir = if level.dir.is_empty() {
                self.root.clone()
            } else {
                self.root.join(level.dir)
            };
            self.prune_except(&dir, level.retain, &mut stats)?;
        }

        tracing::info!(
            root = %self.root.display(),
            scanned = stats.entries_scanned,
            removed = stats.removed.len(),
            dry_run = self.dry_run,
            "Cargo home cleanup complete"
        );

        Ok(stats)
    }

    fn prune_except(&self, dir: &Path, retain: &[&str], stats: &mut PruneStats) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "Directory does not exist, nothing to prune");
                return Ok(());
            }
            Err(e) => return Err(Error::io(e, dir, "read directory")),
        };

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(e, dir, "read directory entry"))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| Error::io(e, &path, "read file type"))?;
            stats.entries_scanned += 1;

            let keep = file_type.is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| retain.contains(&name));
            if keep {
                continue;
            }

            if self.dry_run {
                tracing::info!(path = %path.display(), "[dry-run] Would remove");
            } else {
                Self::remove_entry(&path, file_type)?;
                tracing::debug!(path = %path.display(), "Removed cache entry");
            }
            stats.removed.push(path);
        }

        Ok(())
    }

    fn remove_entry(path: &Path, file_type: FileType) -> Result<()> {
        if file_type.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
        .map_err(|e| Error::io(e, path, "remove"))
    }
}

/// Prune `cargo_home` with the default policy.
///
/// # Errors
///
/// Returns [`Error::Io`] if a directory cannot be read or an entry removed.
pub fn clean_cargo_home(cargo_home: &Path) -> Result<PruneStats> {
    CachePruner::new(cargo_home).run()
}
