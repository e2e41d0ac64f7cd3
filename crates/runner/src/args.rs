//! `cargo install` argument synthesis.
//!
//! The runner owns `--root` and `--color`; anything the operator passes for
//! those is dropped. `--path` and `--target` are only defaulted when the
//! operator has not chosen one.

use crate::env::{BuildEnv, CRT_STATIC_FEATURE};
use crate::error::{Error, Result};
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Cargo subcommand the synthesized arguments are for.
pub const INSTALL_SUBCOMMAND: &str = "install";

const TINY_STACKS: &[&str] = &[
    "io.paketo.stacks.tiny",
    "io.buildpacks.stacks.bionic.tiny",
    "io.buildpacks.stacks.jammy.tiny",
    "io.buildpacks.stacks.noble.tiny",
];

const STATIC_STACKS: &[&str] = &[
    "io.buildpacks.stacks.jammy.static",
    "io.buildpacks.stacks.noble.static",
];

/// Whether `stack` is a tiny base image.
#[must_use]
pub fn is_tiny_stack(stack: &str) -> bool {
    TINY_STACKS.contains(&stack)
}

/// Whether `stack` is a static base image.
#[must_use]
pub fn is_static_stack(stack: &str) -> bool {
    STATIC_STACKS.contains(&stack)
}

/// C library used for statically linked builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StaticType {
    /// `<arch>-unknown-linux-musl`
    #[default]
    Muslc,
    /// `<arch>-unknown-linux-gnu` with a static C runtime
    Gnulibc,
}

impl StaticType {
    /// Configuration value for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Muslc => "muslc",
            Self::Gnulibc => "gnulibc",
        }
    }

    /// Select the type from a configuration value.
    ///
    /// Only `gnulibc` selects glibc; anything else, including an empty or
    /// unrecognised value, falls back to musl.
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        match value.trim() {
            "gnulibc" => Self::Gnulibc,
            "" | "muslc" => Self::Muslc,
            other => {
                warn!(value = %other, "Unknown static type, using muslc");
                Self::Muslc
            }
        }
    }
}

impl FromStr for StaticType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_config(s))
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for [`build_install_args`].
#[derive(Debug, Clone, Copy)]
pub struct InstallArgsRequest<'a> {
    /// Install root, passed as `--root`
    pub dest: &'a Path,
    /// Relative path of the member to install when `--path` is not given
    pub default_member_path: &'a str,
    /// Operator supplied arguments, shell quoted
    pub install_args: &'a str,
    /// Base image stack id
    pub stack: &'a str,
    /// C library for static builds
    pub static_type: StaticType,
}

/// Build the full argument list for `cargo install`.
///
/// May append to the compiler flags in `env` for glibc static builds.
///
/// # Errors
///
/// Returns [`Error::Argument`] if the operator arguments cannot be tokenized.
pub fn build_install_args(
    request: &InstallArgsRequest<'_>,
    env: &mut BuildEnv,
) -> Result<Vec<String>> {
    let operator_args = filter_install_args(request.install_args)?;

    let mut args = Vec::with_capacity(operator_args.len() + 5);
    args.push(INSTALL_SUBCOMMAND.to_string());
    args.extend(operator_args);
    args.push("--color=never".to_string());
    args.push(format!("--root={}", request.dest.display()));

    let args = add_default_path(args, request.default_member_path);
    Ok(add_default_target(args, request.stack, request.static_type, env))
}

/// Tokenize operator arguments and drop `--root` and `--color` in any form.
///
/// # Errors
///
/// Returns [`Error::Argument`] on unbalanced quotes or a dangling escape.
pub fn filter_install_args(raw: &str) -> Result<Vec<String>> {
    let words = shlex::split(raw)
        .ok_or_else(|| Error::argument(format!("unable to tokenize [{raw}]")))?;

    let mut filtered = Vec::with_capacity(words.len());
    let mut skip_next = false;
    for word in words {
        if skip_next {
            skip_next = false;
            continue;
        }
        if word == "--root" || word == "--color" {
            debug!(arg = %word, "Dropping controlled install argument and its value");
            skip_next = true;
            continue;
        }
        if word.starts_with("--root=") || word.starts_with("--color=") {
            debug!(arg = %word, "Dropping controlled install argument");
            continue;
        }
        filtered.push(word);
    }

    Ok(filtered)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| {
        arg.strip_prefix(flag)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
    })
}

/// Append `--path=<default>` unless a `--path` argument is present.
#[must_use]
pub fn add_default_path(mut args: Vec<String>, default_member_path: &str) -> Vec<String> {
    if !has_flag(&args, "--path") {
        args.push(format!("--path={default_member_path}"));
    }
    args
}

/// Append a static linking target for tiny and static stacks.
///
/// Skipped when the stack is neither, when `--target` is present, or when the
/// compiler flags already ask for a static C runtime.
#[must_use]
pub fn add_default_target(
    mut args: Vec<String>,
    stack: &str,
    static_type: StaticType,
    env: &mut BuildEnv,
) -> Vec<String> {
    if !is_tiny_stack(stack) && !is_static_stack(stack) {
        return args;
    }

    // operator picked a target
    if has_flag(&args, "--target") {
        return args;
    }

    // operator already asked for a static build
    if env.has_crt_static() {
        return args;
    }

    let arch = target_arch(env);
    let target = match static_type {
        StaticType::Muslc => format!("--target={arch}-unknown-linux-musl"),
        StaticType::Gnulibc => {
            env.append_rustflags(&format!("-C {CRT_STATIC_FEATURE}"));
            format!("--target={arch}-unknown-linux-gnu")
        }
    };
    debug!(%stack, %static_type, %target, "Adding default target for static build");

    args.push(target);
    args
}

/// CPU architecture in target triple form.
///
/// `BP_ARCH` wins over the architecture this binary was built for.
#[must_use]
pub fn target_arch(env: &BuildEnv) -> String {
    let arch = env.arch_override().unwrap_or(std::env::consts::ARCH);
    match arch {
        "amd64" => "x86_64".to_string(),
        "arm64" => "aarch64".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "io.buildpacks.stacks.jammy.tiny";
    const STATIC: &str = "io.buildpacks.stacks.jammy.static";
    const FULL: &str = "io.buildpacks.stacks.jammy";

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_filter_install_args_drops_controlled_flags() {
        let args =
            filter_install_args("--root /foo --color always --locked --root=/bar --color=auto -v")
                .unwrap();
        assert_eq!(args, strings(&["--locked", "-v"]));
    }

    #[test]
    fn test_filter_install_args_honors_quotes() {
        let args = filter_install_args(r#"--features "a b" --bin 'my bin'"#).unwrap();
        assert_eq!(args, strings(&["--features", "a b", "--bin", "my bin"]));
    }

    #[test]
    fn test_filter_install_args_empty() {
        assert!(filter_install_args("").unwrap().is_empty());
        assert!(filter_install_args("   ").unwrap().is_empty());
    }

    #[test]
    fn test_filter_install_args_unbalanced_quote() {
        let err = filter_install_args("--features \"a b").unwrap_err();
        assert!(matches!(err, Error::Argument { .. }));
    }

    #[test]
    fn test_add_default_path() {
        let args = add_default_path(strings(&["install"]), ".");
        assert_eq!(args, strings(&["install", "--path=."]));

        let args = add_default_path(strings(&["install", "--path", "foo"]), ".");
        assert_eq!(args, strings(&["install", "--path", "foo"]));

        let args = add_default_path(strings(&["install", "--path=foo"]), ".");
        assert_eq!(args, strings(&["install", "--path=foo"]));

        // not a --path flag
        let args = add_default_path(strings(&["install", "--pathological"]), "./svc");
        assert_eq!(args, strings(&["install", "--pathological", "--path=./svc"]));
    }

    #[test]
    fn test_default_target_skipped_for_full_stack() {
        let mut env = BuildEnv::default();
        let args = add_default_target(strings(&["install"]), FULL, StaticType::Muslc, &mut env);
        assert_eq!(args, strings(&["install"]));
    }

    #[test]
    fn test_default_target_musl_on_tiny() {
        let mut env = BuildEnv::default().with_arch_override("amd64");
        let args = add_default_target(strings(&["install"]), TINY, StaticType::Muslc, &mut env);
        assert_eq!(
            args,
            strings(&["install", "--target=x86_64-unknown-linux-musl"])
        );
        assert_eq!(env.rustflags(), None);
    }

    #[test]
    fn test_default_target_gnu_on_static() {
        let mut env = BuildEnv::default()
            .with_arch_override("arm64")
            .with_rustflags("-C opt-level=3");
        let args = add_default_target(strings(&["install"]), STATIC, StaticType::Gnulibc, &mut env);
        assert_eq!(
            args,
            strings(&["install", "--target=aarch64-unknown-linux-gnu"])
        );
        assert_eq!(
            env.rustflags(),
            Some("-C opt-level=3 -C target-feature=+crt-static")
        );
    }

    #[test]
    fn test_default_target_respects_operator_target() {
        let mut env = BuildEnv::default();
        let args = add_default_target(
            strings(&["install", "--target", "riscv64gc-unknown-linux-gnu"]),
            TINY,
            StaticType::Gnulibc,
            &mut env,
        );
        assert_eq!(
            args,
            strings(&["install", "--target", "riscv64gc-unknown-linux-gnu"])
        );
        assert_eq!(env.rustflags(), None);

        let args = add_default_target(
            strings(&["install", "--target=x86_64-unknown-linux-gnu"]),
            TINY,
            StaticType::Muslc,
            &mut env,
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_default_target_respects_crt_static_flag() {
        let mut env = BuildEnv::default().with_rustflags("-C target-feature=+crt-static");
        let args = add_default_target(strings(&["install"]), STATIC, StaticType::Gnulibc, &mut env);
        assert_eq!(args, strings(&["install"]));
        assert_eq!(env.rustflags(), Some("-C target-feature=+crt-static"));
    }

    #[test]
    fn test_target_arch_mapping() {
        let env = BuildEnv::default().with_arch_override("amd64");
        assert_eq!(target_arch(&env), "x86_64");
        let env = BuildEnv::default().with_arch_override("arm64");
        assert_eq!(target_arch(&env), "aarch64");
        let env = BuildEnv::default().with_arch_override("s390x");
        assert_eq!(target_arch(&env), "s390x");
        assert_eq!(target_arch(&BuildEnv::default()), std::env::consts::ARCH);
    }

    #[test]
    fn test_static_type_from_str() {
        assert_eq!("muslc".parse::<StaticType>().unwrap(), StaticType::Muslc);
        assert_eq!("gnulibc".parse::<StaticType>().unwrap(), StaticType::Gnulibc);
        assert_eq!(" gnulibc ".parse::<StaticType>().unwrap(), StaticType::Gnulibc);
    }

    #[test]
    fn test_static_type_falls_back_to_musl() {
        assert_eq!(StaticType::from_config(""), StaticType::Muslc);
        assert_eq!(StaticType::from_config("glibc"), StaticType::Muslc);
        assert_eq!(StaticType::from_config("GNULIBC"), StaticType::Muslc);
    }

    #[test]
    fn test_build_install_args_non_static() {
        let mut env = BuildEnv::default();
        let request = InstallArgsRequest {
            dest: Path::new("/dest"),
            default_member_path: ".",
            install_args: "--release --root=/old",
            stack: FULL,
            static_type: StaticType::Muslc,
        };
        let args = build_install_args(&request, &mut env).unwrap();
        assert_eq!(
            args,
            strings(&[
                "install",
                "--release",
                "--color=never",
                "--root=/dest",
                "--path=.",
            ])
        );
    }

    #[test]
    fn test_build_install_args_tiny_stack() {
        let mut env = BuildEnv::default().with_arch_override("amd64");
        let request = InstallArgsRequest {
            dest: Path::new("/layers/cargo"),
            default_member_path: "./services/api",
            install_args: "--locked --color always",
            stack: TINY,
            static_type: StaticType::Muslc,
        };
        let args = build_install_args(&request, &mut env).unwrap();
        assert_eq!(
            args,
            strings(&[
                "install",
                "--locked",
                "--color=never",
                "--root=/layers/cargo",
                "--path=./services/api",
                "--target=x86_64-unknown-linux-musl",
            ])
        );
    }
}
