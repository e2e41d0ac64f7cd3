//! The cargo runner: installs, metadata queries and cache cleanup.

use crate::args::{InstallArgsRequest, StaticType, build_install_args};
use crate::cache::{CachePruner, PruneStats};
use crate::env::BuildEnv;
use crate::error::{Error, Result};
use crate::exec::{Execution, Executor, LogWriter, ProcessExecutor};
use crate::filter::MemberFilter;
use crate::member::WorkspaceMember;
use crate::metadata::ProjectMetadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Relative member path used for single package projects.
pub const DEFAULT_MEMBER_PATH: &str = ".";

/// Indentation levels for cargo's own output in the log.
const OUTPUT_INDENT: usize = 3;

/// Operations the buildpack host needs from cargo.
pub trait CargoService {
    /// Install the project at `src_dir` into `dest`.
    ///
    /// # Errors
    ///
    /// See [`CargoService::install_member`].
    fn install(&self, src_dir: &Path, dest: &Path) -> Result<()>;

    /// Install the workspace member at `member_path` (relative to `src_dir`)
    /// into `dest`, then prune the cargo home.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments cannot be built, `cargo install`
    /// fails, or pruning fails.
    fn install_member(&self, member_path: &str, src_dir: &Path, dest: &Path) -> Result<()>;

    /// Run `cargo install <name> <extra_args>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if cargo fails.
    fn install_tool(&self, name: &str, extra_args: &[String]) -> Result<()>;

    /// Locations of the workspace members that pass the member filter.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata cannot be loaded or a member is malformed.
    fn workspace_members(&self, src_dir: &Path, dest: &Path) -> Result<Vec<Url>>;

    /// Binary target names of the members that pass the member filter.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata cannot be loaded or a member is malformed.
    fn project_targets(&self, src_dir: &Path) -> Result<Vec<String>>;

    /// Remove everything but the reusable parts of the cargo home.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the tree cannot be read or an entry removed.
    fn clean_cargo_home(&self) -> Result<PruneStats>;

    /// Version reported by `cargo version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if cargo fails or prints no version.
    fn cargo_version(&self) -> Result<String>;

    /// Version reported by `rustc --version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if rustc fails or prints no version.
    fn rust_version(&self) -> Result<String>;
}

/// Runner configuration, usually read from the buildpack environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    /// `$CARGO_HOME`
    pub cargo_home: PathBuf,
    /// Comma separated workspace member names to build, empty for all
    pub workspace_members: String,
    /// Additional `cargo install` arguments, shell quoted
    pub install_args: String,
    /// Base image stack id
    pub stack: String,
    /// C library for static builds
    pub static_type: StaticType,
}

/// [`CargoService`] that shells out to cargo through an [`Executor`].
#[derive(Clone)]
pub struct CargoRunner {
    config: RunnerConfig,
    env: BuildEnv,
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for CargoRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CargoRunner")
            .field("config", &self.config)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl Default for CargoRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl CargoRunner {
    /// Runner with the given configuration, the process executor and an
    /// environment captured from the current process.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            env: BuildEnv::from_process(),
            executor: Arc::new(ProcessExecutor),
        }
    }

    /// Set `$CARGO_HOME`.
    #[must_use]
    pub fn with_cargo_home(mut self, cargo_home: impl Into<PathBuf>) -> Self {
        self.config.cargo_home = cargo_home.into();
        self
    }

    /// Set the comma separated workspace member filter.
    #[must_use]
    pub fn with_workspace_members(mut self, members: impl Into<String>) -> Self {
        self.config.workspace_members = members.into();
        self
    }

    /// Set additional `cargo install` arguments.
    #[must_use]
    pub fn with_install_args(mut self, args: impl Into<String>) -> Self {
        self.config.install_args = args.into();
        self
    }

    /// Set the stack id.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.config.stack = stack.into();
        self
    }

    /// Set the static build type.
    #[must_use]
    pub fn with_static_type(mut self, static_type: StaticType) -> Self {
        self.config.static_type = static_type;
        self
    }

    /// Set the build environment.
    #[must_use]
    pub fn with_env(mut self, env: BuildEnv) -> Self {
        self.env = env;
        self
    }

    /// Set the executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// The runner configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Build the `cargo install` arguments for installing into `dest`.
    ///
    /// `env` receives any compiler flags the static build needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the configured install arguments are
    /// malformed.
    pub fn build_args(
        &self,
        dest: &Path,
        default_member_path: &str,
        env: &mut BuildEnv,
    ) -> Result<Vec<String>> {
        let request = InstallArgsRequest {
            dest,
            default_member_path,
            install_args: &self.config.install_args,
            stack: &self.config.stack,
            static_type: self.config.static_type,
        };
        build_install_args(&request, env)
    }

    fn member_filter(&self) -> MemberFilter {
        MemberFilter::parse(&self.config.workspace_members)
    }

    /// Workspace members of `metadata` that pass the filter, in cargo's order.
    fn filtered_members<'m>(
        &self,
        metadata: &'m ProjectMetadata,
    ) -> Result<Vec<(&'m str, WorkspaceMember)>> {
        let filter = self.member_filter();
        let mut kept = Vec::with_capacity(metadata.workspace_members.len());
        for raw in &metadata.workspace_members {
            let member = WorkspaceMember::parse(raw)?;
            if filter.matches(member.name()) {
                kept.push((raw.as_str(), member));
            } else {
                debug!(member = %member.name(), "Skipping filtered workspace member");
            }
        }
        Ok(kept)
    }

    fn run_version(&self, command: &str, args: &[&str]) -> Result<String> {
        let execution = Execution::new(command).args(args.iter().copied());
        let command_line = execution.command_line();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let result = self.executor.execute(&execution, &mut stdout, &mut stderr);
        stdout.extend_from_slice(&stderr);
        let combined = String::from_utf8_lossy(&stdout);

        if let Err(e) = result {
            return Err(Error::execution(
                &command_line,
                format!("{e}\nCombined Output: {combined}"),
            ));
        }

        parse_version(&combined).ok_or_else(|| {
            Error::execution(command_line, format!("unexpected version output [{combined}]"))
        })
    }
}

/// Second whitespace separated field, e.g. `1.77.0` in `cargo 1.77.0 (abc 2024-02-29)`.
fn parse_version(output: &str) -> Option<String> {
    output.split_whitespace().nth(1).map(String::from)
}

impl CargoService for CargoRunner {
    fn install(&self, src_dir: &Path, dest: &Path) -> Result<()> {
        self.install_member(DEFAULT_MEMBER_PATH, src_dir, dest)
    }

    fn install_member(&self, member_path: &str, src_dir: &Path, dest: &Path) -> Result<()> {
        let mut env = self.env.clone();
        // keeps `cargo install` from warning that the root is not on PATH
        if env.append_layer_bin(dest) {
            debug!(path = ?env.path(), "Added install root to PATH");
        }

        let args = self.build_args(dest, member_path, &mut env)?;

        let execution = Execution::new("cargo")
            .args(args)
            .dir(src_dir)
            .env(env.vars());
        info!("{}", execution.command_line());

        let mut stdout = LogWriter::with_indent(OUTPUT_INDENT);
        let mut stderr = LogWriter::with_indent(OUTPUT_INDENT);
        self.executor.execute(&execution, &mut stdout, &mut stderr)?;

        self.clean_cargo_home()?;
        Ok(())
    }

    fn install_tool(&self, name: &str, extra_args: &[String]) -> Result<()> {
        let mut args = vec!["install".to_string(), name.to_string()];
        args.extend_from_slice(extra_args);

        let execution = Execution::new("cargo").args(args).env(self.env.vars());
        info!("{}", execution.command_line());

        let mut stdout = LogWriter::with_indent(OUTPUT_INDENT);
        let mut stderr = LogWriter::with_indent(OUTPUT_INDENT);
        self.executor.execute(&execution, &mut stdout, &mut stderr)
    }

    fn workspace_members(&self, src_dir: &Path, _dest: &Path) -> Result<Vec<Url>> {
        let metadata = ProjectMetadata::fetch(self.executor.as_ref(), src_dir)?;

        self.filtered_members(&metadata)?
            .into_iter()
            .map(|(_, member)| member.location_url())
            .collect()
    }

    fn project_targets(&self, src_dir: &Path) -> Result<Vec<String>> {
        let metadata = ProjectMetadata::fetch(self.executor.as_ref(), src_dir)?;
        let members = self.filtered_members(&metadata)?;

        let mut names = Vec::new();
        for pkg in &metadata.packages {
            if !members.iter().any(|(raw, _)| *raw == pkg.id) {
                continue;
            }
            names.extend(
                pkg.targets
                    .iter()
                    .filter(|target| {
                        target.is_bin() && Path::new(&target.src_path).starts_with(src_dir)
                    })
                    .map(|target| target.name.clone()),
            );
        }

        Ok(names)
    }

    fn clean_cargo_home(&self) -> Result<PruneStats> {
        CachePruner::new(&self.config.cargo_home).run()
    }

    fn cargo_version(&self) -> Result<String> {
        self.run_version("cargo", &["version"])
    }

    fn rust_version(&self) -> Result<String> {
        self.run_version("rustc", &["--version"])
    }
}
