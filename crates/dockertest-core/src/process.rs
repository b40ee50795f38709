//! Child process execution with combined output capture.
//!
//! [`ProcessExecutor`] is the seam both runners are built on: it takes a
//! [`CommandInvocation`], runs it to completion and hands back a
//! [`CommandResult`]. [`SystemExecutor`] spawns real processes;
//! [`crate::fakes::ScriptedExecutor`] replays canned results in tests.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, ExecutionError, Result};

/// A single command to run: program, arguments and where to run it.
///
/// Arguments are kept as `OsString` so a checked path reaches the child
/// byte-for-byte, including paths that are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Program name followed by its arguments.
    pub argv: Vec<OsString>,

    /// Directory the child starts in.
    pub working_dir: PathBuf,

    /// Send the child's stderr into the same captured stream as stdout.
    pub merge_stderr: bool,
}

impl CommandInvocation {
    /// Build an invocation with stderr merged into stdout.
    pub fn new<I, S>(argv: I, working_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            merge_stderr: true,
        }
    }

    /// Capture stdout only; stderr goes to the parent's stderr.
    pub fn without_merge(mut self) -> Self {
        self.merge_stderr = false;
        self
    }

    /// The program to spawn, if any.
    pub fn program(&self) -> Option<&OsStr> {
        self.argv.first().map(OsString::as_os_str)
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[OsString] {
        self.argv.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.argv {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg.to_string_lossy())?;
            first = false;
        }
        Ok(())
    }
}

/// Outcome of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit code (0 = success, -1 when terminated by a signal).
    pub exit_code: i32,

    /// Captured output, stdout and stderr interleaved when merged.
    pub output: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            duration_ms: 0,
        }
    }

    /// Whether the child exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into an [`ExecutionError`] for `invocation`.
    pub fn into_checked(self, invocation: &CommandInvocation) -> Result<CommandResult> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecutionError {
                command: invocation.to_string(),
                exit_code: self.exit_code,
                output: self.output,
            }
            .into())
        }
    }
}

/// Runs a [`CommandInvocation`] to completion.
///
/// Implementations block the calling thread until the child exits. A
/// non-zero exit code is a normal result, not an error; only failures to
/// start the child or read its output are reported as `Err`.
pub trait ProcessExecutor: Send + Sync {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandResult>;
}

/// Spawns real child processes via `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandResult> {
        let start = Instant::now();

        let Some(program) = invocation.program() else {
            return Err(Error::Spawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        trace!(command = %invocation, dir = %invocation.working_dir.display(), "Starting process");

        let mut command = Command::new(program);
        command
            .args(invocation.args())
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null());

        let (mut reader, writer) = std::io::pipe()?;
        if invocation.merge_stderr {
            command.stderr(writer.try_clone()?);
        } else {
            command.stderr(Stdio::inherit());
        }
        command.stdout(writer);

        let spawned = command.spawn();
        // The parent's copies of the write end live inside `command`; they
        // must be closed or the read below never sees EOF.
        drop(command);
        let mut child = spawned.map_err(|source| Error::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        let mut buf = Vec::new();
        let read = reader.read_to_end(&mut buf);
        let status = child.wait()?;
        read?;

        let output = String::from_utf8_lossy(&buf).into_owned();
        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;

        trace!(output = %output, "Process output");
        debug!(command = %invocation, exit_code, duration_ms, "Process exited");

        Ok(CommandResult {
            exit_code,
            output,
            duration_ms,
        })
    }
}

/// Resolve `path` against the current directory without touching the
/// filesystem.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}
