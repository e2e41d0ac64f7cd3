//! Error types for the cnb-cargo runner

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for runner operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A workspace member identifier did not match either known encoding
    #[error("unable to parse workspace member [{input}], {reason}")]
    #[diagnostic(
        code(cnb_cargo::member::parse),
        help("Expected `name version (url)` or `url#name@version` / `url#version`")
    )]
    Parse {
        /// The raw identifier as reported by cargo
        input: String,
        /// Why the identifier was rejected
        reason: String,
    },

    /// Operator supplied install arguments could not be used
    #[error("invalid install arguments: {message}")]
    #[diagnostic(code(cnb_cargo::args::invalid))]
    Argument {
        /// Error message describing the argument issue
        message: String,
    },

    /// `cargo metadata` failed or produced output that could not be decoded
    #[error("unable to read cargo metadata: {message}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    #[diagnostic(
        code(cnb_cargo::metadata),
        help("Run `cargo metadata --format-version=1 --no-deps` in the source directory")
    )]
    Metadata {
        /// Error message describing the failure
        message: String,
        /// Captured standard output of the metadata command
        stdout: String,
        /// Captured standard error of the metadata command
        stderr: String,
    },

    /// An external command exited unsuccessfully or could not be started
    #[error("`{command}` failed: {message}")]
    #[diagnostic(code(cnb_cargo::exec))]
    Execution {
        /// The command line that was run
        command: String,
        /// Error message describing the failure
        message: String,
    },

    /// A workspace member location is not a valid URL
    #[error("unable to parse path URL {input}: {source}")]
    #[diagnostic(code(cnb_cargo::member::url))]
    InvalidUrl {
        /// The raw workspace member identifier the location came from
        input: String,
        /// The underlying URL parser error
        #[source]
        source: url::ParseError,
    },

    /// I/O error during cache pruning or process plumbing
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(cnb_cargo::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "remove")
        operation: String,
    },
}

impl Error {
    /// Create a workspace member parse error
    #[must_use]
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an argument error
    #[must_use]
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Create a metadata error carrying both captured streams
    #[must_use]
    pub fn metadata(
        message: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Metadata {
            message: message.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an execution error
    #[must_use]
    pub fn execution(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }
}

/// Result type for runner operations
pub type Result<T> = std::result::Result<T, Error>;
