//! `docker compose` lifecycle for integration tests.
//!
//! Every operation follows the same path: the compose file must exist, the
//! command `docker compose -f <abs> <args...>` is run from the file's parent
//! directory, and a non-zero exit becomes an [`ExecutionError`].
//!
//! [`ExecutionError`]: crate::error::ExecutionError

use std::ffi::OsString;
use std::path::Path;

use tracing::{debug, error, trace};

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::process::{CommandInvocation, CommandResult, ProcessExecutor, SystemExecutor};
use crate::validation::ValidationTarget;

/// Drives `docker compose` against a compose file.
#[derive(Debug, Clone)]
pub struct ComposeRunner<E = SystemExecutor> {
    executor: E,
    program: String,
}

impl ComposeRunner<SystemExecutor> {
    /// Runner that spawns the `docker` found on `PATH`.
    pub fn new() -> Self {
        Self::with_executor(SystemExecutor)
    }

    /// Runner using the docker program named in `config`.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::with_executor(SystemExecutor).with_program(config.docker_program.clone())
    }
}

impl Default for ComposeRunner<SystemExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ProcessExecutor> ComposeRunner<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            program: "docker".to_string(),
        }
    }

    /// Replace the program invoked in place of `docker`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Start the services and block until they are healthy (`up --wait`).
    pub fn up(&self, compose_file: impl AsRef<Path>) -> Result<()> {
        let compose_file = compose_file.as_ref();
        debug!(file = %compose_file.display(), "Starting docker compose services");
        self.run(compose_file, ["up", "--wait"])?;
        debug!("Docker compose services started");
        Ok(())
    }

    /// Stop the services and remove their volumes (`down -v`).
    pub fn down(&self, compose_file: impl AsRef<Path>) -> Result<()> {
        let compose_file = compose_file.as_ref();
        debug!(file = %compose_file.display(), "Stopping docker compose services");
        self.run(compose_file, ["down", "-v"])?;
        debug!("Docker compose services stopped");
        Ok(())
    }

    /// Run `docker compose -f <file>` with arbitrary trailing arguments.
    pub fn run<I, S>(&self, compose_file: impl AsRef<Path>, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let compose_file = ValidationTarget::file(compose_file.as_ref()).validate()?;
        let working_dir = compose_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| compose_file.clone());

        let mut argv: Vec<OsString> = vec![
            self.program.clone().into(),
            "compose".into(),
            "-f".into(),
            compose_file.into_os_string(),
        ];
        argv.extend(args.into_iter().map(Into::into));

        let invocation = CommandInvocation::new(argv, working_dir);
        trace!(command = %invocation, "Executing docker compose command");

        let result = self.executor.execute(&invocation)?;
        if !result.success() {
            error!(
                exit_code = result.exit_code,
                output = %result.output,
                "docker compose command failed"
            );
        }
        result.into_checked(&invocation)
    }
}
