//! External command execution.
//!
//! [`Executor`] is the seam between the runner and the processes it launches,
//! so tests can substitute a recording fake. [`LogWriter`] is the sink used for
//! cargo's own output during installs.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// A single command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Program to run, resolved through the search path
    pub command: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub dir: Option<PathBuf>,
    /// Variables set on the child in addition to the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Execution {
    /// Create an execution of `command` with no arguments.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set the arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Set the child environment overrides.
    #[must_use]
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// The command line as a single string, e.g. `cargo install --locked`.
    #[must_use]
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            return self.command.clone();
        }
        format!("{} {}", self.command, self.args.join(" "))
    }
}

/// Runs commands to completion.
pub trait Executor: Send + Sync {
    /// Run `execution`, streaming its output into `stdout` and `stderr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if the command cannot be started or exits
    /// unsuccessfully.
    fn execute(
        &self,
        execution: &Execution,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
    ) -> Result<()>;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(
        &self,
        execution: &Execution,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
    ) -> Result<()> {
        let command_line = execution.command_line();
        debug!(command = %command_line, dir = ?execution.dir, "Executing command");

        let mut cmd = Command::new(&execution.command);
        cmd.args(&execution.args)
            .envs(&execution.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &execution.dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::execution(&command_line, format!("unable to start: {e}")))?;

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let copied = std::thread::scope(|scope| {
            let err_handle = scope.spawn(move || match child_stderr {
                Some(mut pipe) => io::copy(&mut pipe, stderr).map(|_| ()),
                None => Ok(()),
            });
            let out_result = match child_stdout {
                Some(mut pipe) => io::copy(&mut pipe, stdout).map(|_| ()),
                None => Ok(()),
            };
            let err_result = err_handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));
            out_result.and(err_result)
        });

        let status = child
            .wait()
            .map_err(|e| Error::execution(&command_line, format!("unable to wait: {e}")))?;
        copied.map_err(|e| Error::io_no_path(e, "copy command output"))?;

        if !status.success() {
            return Err(Error::execution(
                command_line,
                status.code().map_or_else(
                    || "terminated by signal".to_string(),
                    |code| format!("exit status {code}"),
                ),
            ));
        }

        Ok(())
    }
}

/// Line-buffered sink that forwards each line to `tracing` at info level.
#[derive(Debug)]
pub struct LogWriter {
    indent: String,
    pending: Vec<u8>,
}

impl LogWriter {
    /// Two spaces per level.
    const INDENT_WIDTH: usize = 2;

    /// Create a writer that prefixes every line with `levels` indentation levels.
    #[must_use]
    pub fn with_indent(levels: usize) -> Self {
        Self {
            indent: " ".repeat(levels * Self::INDENT_WIDTH),
            pending: Vec::new(),
        }
    }

    fn emit(&self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        info!(target: "cnb_cargo::output", "{}{}", self.indent, line);
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::with_indent(0)
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
