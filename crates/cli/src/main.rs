//! cnb-cargo command line host
//!
//! Reads the buildpack configuration from the environment and runs one
//! cargo runner operation per invocation.

// CLI writes query results to stdout as part of its normal operation
#![allow(clippy::print_stdout)]

mod cli;
mod tracing;

use crate::cli::{Cli, Commands};
use crate::tracing::TracingConfig;
use ::tracing::info;
use clap::Parser;
use cnb_cargo_runner::{CachePruner, CargoRunner, CargoService, location_path};
use miette::IntoDiagnostic;

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    crate::tracing::init_tracing(TracingConfig {
        format: cli.tracing_format(),
        level: cli.level.into(),
        ..TracingConfig::default()
    })?;

    let runner = CargoRunner::new(cli.runner.into_config());
    execute_command(&runner, cli.command)
}

fn execute_command(runner: &CargoRunner, command: Commands) -> miette::Result<()> {
    match command {
        Commands::Install { member, src, dest } => match member {
            Some(member) => runner.install_member(&member, &src, &dest)?,
            None => runner.install(&src, &dest)?,
        },
        Commands::InstallTool { name, args } => runner.install_tool(&name, &args)?,
        Commands::Members { src, dest } => {
            for url in runner.workspace_members(&src, &dest)? {
                match location_path(&url) {
                    Some(path) => println!("{}", path.display()),
                    None => println!("{url}"),
                }
            }
        }
        Commands::Targets { src } => {
            let src = std::path::absolute(&src).into_diagnostic()?;
            for name in runner.project_targets(&src)? {
                println!("{name}");
            }
        }
        Commands::CleanCache { dry_run } => {
            let cargo_home = &runner.config().cargo_home;
            let pruner = CachePruner::new(cargo_home);
            let stats = if dry_run {
                pruner.dry_run().run()?
            } else {
                pruner.run()?
            };
            for path in &stats.removed {
                println!("{}", path.display());
            }
        }
        Commands::Version => {
            let cargo = runner.cargo_version()?;
            let rustc = runner.rust_version()?;
            info!(%cargo, %rustc, "Toolchain versions");
            println!("cargo {cargo}");
            println!("rustc {rustc}");
        }
    }

    Ok(())
}
