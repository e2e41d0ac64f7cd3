use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use cnb_cargo_runner::{RunnerConfig, StaticType};
use std::convert::Infallible;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cnb-cargo")]
#[command(about = "Install Rust applications with cargo inside a buildpack build")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub runner: RunnerArgs,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,
}

impl Cli {
    /// Log format, with `--json` taking precedence over `--log-format`.
    pub fn tracing_format(&self) -> TracingFormat {
        if self.json {
            TracingFormat::Json
        } else {
            self.log_format
        }
    }
}

/// Runner settings, normally provided by the buildpack environment.
#[derive(Args, Debug, Clone)]
pub struct RunnerArgs {
    #[arg(long, global = true, env = "CARGO_HOME", help = "Cargo home directory")]
    pub cargo_home: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "BP_CARGO_WORKSPACE_MEMBERS",
        default_value = "",
        hide_default_value = true,
        help = "Comma separated workspace members to build"
    )]
    pub workspace_members: String,

    #[arg(
        long,
        global = true,
        env = "BP_CARGO_INSTALL_ARGS",
        default_value = "",
        hide_default_value = true,
        allow_hyphen_values = true,
        help = "Additional arguments for cargo install"
    )]
    pub install_args: String,

    #[arg(
        long,
        global = true,
        env = "CNB_STACK_ID",
        default_value = "",
        hide_default_value = true,
        help = "Stack id of the run image"
    )]
    pub stack: String,

    #[arg(
        long,
        global = true,
        env = "BP_CARGO_STATIC_TYPE",
        default_value = "muslc",
        value_parser = parse_static_type,
        help = "C library for static builds (gnulibc, anything else selects muslc)"
    )]
    pub static_type: StaticType,
}

fn parse_static_type(value: &str) -> Result<StaticType, Infallible> {
    Ok(StaticType::from_config(value))
}

impl RunnerArgs {
    /// Runner configuration, defaulting `$CARGO_HOME` to `~/.cargo`.
    pub fn into_config(self) -> RunnerConfig {
        let cargo_home = self.cargo_home.unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cargo")
        });
        RunnerConfig {
            cargo_home,
            workspace_members: self.workspace_members,
            install_args: self.install_args,
            stack: self.stack,
            static_type: self.static_type,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Install the project, or one workspace member, into a layer")]
    Install {
        #[arg(long, help = "Workspace member path relative to the source directory")]
        member: Option<String>,
        #[arg(long, default_value = ".", help = "Project source directory")]
        src: PathBuf,
        #[arg(long, help = "Install root")]
        dest: PathBuf,
    },
    #[command(about = "Install a cargo tool by crate name")]
    InstallTool {
        name: String,
        #[arg(last = true, help = "Additional cargo install arguments")]
        args: Vec<String>,
    },
    #[command(about = "List workspace member locations")]
    Members {
        #[arg(long, default_value = ".", help = "Project source directory")]
        src: PathBuf,
        #[arg(long, help = "Install root")]
        dest: PathBuf,
    },
    #[command(about = "List binary targets of the workspace members")]
    Targets {
        #[arg(long, default_value = ".", help = "Project source directory")]
        src: PathBuf,
    },
    #[command(about = "Remove non-reusable files from the cargo home")]
    CleanCache {
        #[arg(long, help = "Only report what would be removed")]
        dry_run: bool,
    },
    #[command(about = "Show cargo and rustc versions")]
    Version,
}
