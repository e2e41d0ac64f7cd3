//! Build environment passed to cargo.
//!
//! The runner never mutates the process environment. Values it needs to change
//! (`PATH`, `RUSTFLAGS`) are held here and handed to the child process by the
//! executor when the command is launched.

use std::collections::BTreeMap;
use std::path::Path;

/// Search path variable.
pub const PATH: &str = "PATH";
/// Linker/compiler flags consumed by cargo.
pub const RUSTFLAGS: &str = "RUSTFLAGS";
/// Architecture override, takes precedence over the detected architecture.
pub const BP_ARCH: &str = "BP_ARCH";

/// Flag that asks rustc for a statically linked C runtime.
pub const CRT_STATIC_FEATURE: &str = "target-feature=+crt-static";

const PATH_SEPARATOR: &str = ":";

/// Snapshot of the environment values the runner reads and extends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    path: Option<String>,
    rustflags: Option<String>,
    arch_override: Option<String>,
}

impl BuildEnv {
    /// Capture `PATH`, `RUSTFLAGS` and `BP_ARCH` from the current process.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            path: std::env::var(PATH).ok(),
            rustflags: std::env::var(RUSTFLAGS).ok(),
            arch_override: std::env::var(BP_ARCH).ok(),
        }
    }

    /// Set the search path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the compiler flags.
    #[must_use]
    pub fn with_rustflags(mut self, flags: impl Into<String>) -> Self {
        self.rustflags = Some(flags.into());
        self
    }

    /// Set the architecture override.
    #[must_use]
    pub fn with_arch_override(mut self, arch: impl Into<String>) -> Self {
        self.arch_override = Some(arch.into());
        self
    }

    /// Current search path.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Current compiler flags.
    #[must_use]
    pub fn rustflags(&self) -> Option<&str> {
        self.rustflags.as_deref()
    }

    /// Architecture override, if any.
    #[must_use]
    pub fn arch_override(&self) -> Option<&str> {
        self.arch_override.as_deref()
    }

    /// Whether the compiler flags already request a static C runtime.
    #[must_use]
    pub fn has_crt_static(&self) -> bool {
        self.rustflags
            .as_deref()
            .is_some_and(|flags| flags.contains(CRT_STATIC_FEATURE))
    }

    /// Append `<layer>/bin` to the search path.
    ///
    /// Only a non-empty path without a `<layer>/bin` entry is changed.
    /// Returns whether the path was updated.
    pub fn append_layer_bin(&mut self, layer: &Path) -> bool {
        let bin = layer.join("bin");
        let has_bin = |path: &str| {
            path.split(PATH_SEPARATOR)
                .any(|entry| Path::new(entry) == bin.as_path())
        };
        match self.path.as_deref() {
            Some(path) if !path.is_empty() && !has_bin(path) => {
                self.path = Some(format!("{path}{PATH_SEPARATOR}{}", bin.display()));
                true
            }
            _ => false,
        }
    }

    /// Append `flags` to the compiler flags, space separated.
    pub fn append_rustflags(&mut self, flags: &str) {
        self.rustflags = Some(match self.rustflags.take() {
            Some(prior) if !prior.is_empty() => format!("{prior} {flags}"),
            _ => flags.to_string(),
        });
    }

    /// Variables to set on a child process.
    #[must_use]
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        if let Some(path) = &self.path {
            vars.insert(PATH.to_string(), path.clone());
        }
        if let Some(flags) = &self.rustflags {
            vars.insert(RUSTFLAGS.to_string(), flags.clone());
        }
        vars
    }
}
