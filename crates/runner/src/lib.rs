//! Cargo install engine for buildpacks
//!
//! This crate decides how to invoke `cargo install` on behalf of a build
//! pipeline and interprets the metadata cargo reports about a project:
//! - Workspace member identifiers in both the pre-1.77 and current encodings
//! - Operator allow-lists of workspace members
//! - `cargo install` argument synthesis, including static linking targets for
//!   tiny and static base images
//! - Pruning `$CARGO_HOME` down to its reusable, content addressed parts
//!
//! # Overview
//!
//! [`CargoRunner`] implements [`CargoService`], the operations a buildpack
//! host calls. Processes are launched through an [`Executor`]; the default
//! [`ProcessExecutor`] uses [`std::process::Command`]. Environment changes the
//! install needs (`PATH`, `RUSTFLAGS`) are carried in a [`BuildEnv`] and
//! applied to the child process only, never to the current process.
//!
//! ```no_run
//! use cnb_cargo_runner::{CargoRunner, CargoService, RunnerConfig};
//! use std::path::Path;
//!
//! let runner = CargoRunner::new(RunnerConfig::default())
//!     .with_cargo_home("/home/cnb/.cargo")
//!     .with_install_args("--locked");
//! runner.install(Path::new("/workspace"), Path::new("/layers/cargo"))?;
//! # Ok::<(), cnb_cargo_runner::Error>(())
//! ```

pub mod args;
pub mod cache;
pub mod env;
pub mod error;
pub mod exec;
pub mod filter;
pub mod member;
pub mod metadata;
pub mod runner;

pub use args::{InstallArgsRequest, StaticType, build_install_args};
pub use cache::{CachePruner, CacheRetentionPolicy, PruneStats, RetentionLevel};
pub use env::BuildEnv;
pub use error::{Error, Result};
pub use exec::{Execution, Executor, LogWriter, ProcessExecutor};
pub use filter::MemberFilter;
pub use member::{MemberEncoding, WorkspaceMember, location_path};
pub use metadata::{PackageInfo, ProjectMetadata, TargetInfo};
pub use runner::{CargoRunner, CargoService, DEFAULT_MEMBER_PATH, RunnerConfig};
