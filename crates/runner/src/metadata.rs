//! `cargo metadata` output.

use crate::error::{Error, Result};
use crate::exec::{Execution, Executor};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Arguments for `cargo metadata`, without dependencies.
pub const METADATA_ARGS: [&str; 3] = ["metadata", "--format-version=1", "--no-deps"];

/// A build target of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TargetInfo {
    /// Target kinds, e.g. `bin`, `lib`
    #[serde(rename = "kind")]
    pub kinds: Vec<String>,
    /// Crate types, e.g. `bin`, `rlib`
    pub crate_types: Vec<String>,
    /// Target name
    pub name: String,
    /// Absolute path of the target's root source file
    pub src_path: String,
    /// Rust edition
    pub edition: String,
    /// Whether documentation is built
    pub doc: bool,
    /// Whether doc tests run
    pub doctest: bool,
    /// Whether tests run
    pub test: bool,
}

impl TargetInfo {
    /// Whether this target produces a binary.
    #[must_use]
    pub fn is_bin(&self) -> bool {
        self.kinds.iter().any(|kind| kind == "bin")
    }
}

/// A package in the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    /// Package id, identical to its workspace member identifier
    pub id: String,
    /// Package name
    pub name: String,
    /// Build targets
    pub targets: Vec<TargetInfo>,
}

/// Decoded `cargo metadata` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    /// Packages, in cargo's order
    pub packages: Vec<PackageInfo>,
    /// Raw workspace member identifiers
    pub workspace_members: Vec<String>,
}

impl ProjectMetadata {
    /// Decode metadata JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] if `json` is not a metadata document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::metadata(format!("unable to parse Cargo metadata: {e}"), json, "")
        })
    }

    /// Run `cargo metadata` in `src_dir` and decode its output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] with both captured streams if the command
    /// fails or its output cannot be decoded.
    pub fn fetch(executor: &dyn Executor, src_dir: &Path) -> Result<Self> {
        let execution = Execution::new("cargo").args(METADATA_ARGS).dir(src_dir);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let result = executor.execute(&execution, &mut stdout, &mut stderr);
        let stdout = String::from_utf8_lossy(&stdout);
        let stderr = String::from_utf8_lossy(&stderr);

        if let Err(e) = result {
            return Err(Error::metadata(e.to_string(), stdout, stderr));
        }

        let metadata: Self = serde_json::from_str(&stdout).map_err(|e| {
            Error::metadata(
                format!("unable to parse Cargo metadata: {e}"),
                stdout.as_ref(),
                stderr.as_ref(),
            )
        })?;

        debug!(
            dir = %src_dir.display(),
            packages = metadata.packages.len(),
            members = metadata.workspace_members.len(),
            "Loaded cargo metadata"
        );
        Ok(metadata)
    }

    /// The package whose id is `id`.
    #[must_use]
    pub fn package(&self, id: &str) -> Option<&PackageInfo> {
        self.packages.iter().find(|pkg| pkg.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "packages": [
            {
                "name": "api",
                "version": "0.1.0",
                "id": "path+file:///ws/api#0.1.0",
                "targets": [
                    {
                        "kind": ["bin"],
                        "crate_types": ["bin"],
                        "name": "api",
                        "src_path": "/ws/api/src/main.rs",
                        "edition": "2021",
                        "doc": true,
                        "doctest": false,
                        "test": true
                    },
                    {
                        "kind": ["lib"],
                        "crate_types": ["lib"],
                        "name": "api",
                        "src_path": "/ws/api/src/lib.rs",
                        "edition": "2021"
                    }
                ]
            }
        ],
        "workspace_members": ["path+file:///ws/api#0.1.0"],
        "resolve": null,
        "target_directory": "/ws/target",
        "version": 1
    }"#;

    #[test]
    fn test_decode_sample() {
        let metadata = ProjectMetadata::from_json(SAMPLE).unwrap();
        assert_eq!(metadata.workspace_members, vec!["path+file:///ws/api#0.1.0"]);
        let pkg = metadata.package("path+file:///ws/api#0.1.0").unwrap();
        assert_eq!(pkg.name, "api");
        assert_eq!(pkg.targets.len(), 2);
        assert!(pkg.targets[0].is_bin());
        assert!(pkg.targets[0].doc);
        assert!(!pkg.targets[1].is_bin());
        assert!(!pkg.targets[1].test);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let metadata = ProjectMetadata::from_json("{}").unwrap();
        assert!(metadata.packages.is_empty());
        assert!(metadata.workspace_members.is_empty());

        let metadata = ProjectMetadata::from_json(r#"{"packages":[{"id":"x"}]}"#).unwrap();
        assert!(metadata.packages[0].targets.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let err = ProjectMetadata::from_json("not json").unwrap_err();
        assert!(matches!(err, Error::Metadata { .. }));
    }
}
