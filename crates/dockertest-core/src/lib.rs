//! dockertest-core: docker compose and kubectl lifecycle helpers
//!
//! Integration tests use these runners to bring external services up before
//! a test and tear them down afterwards:
//!
//! - [`ComposeRunner`]: `docker compose -f <file> up --wait` / `down -v` / anything else
//! - [`KubectlRunner`]: apply, delete and wait on manifests; cluster checks and status
//!
//! Both validate their paths before spawning anything, block until the tool
//! exits, and turn a non-zero exit into [`ExecutionError`] carrying the
//! tool's combined output. Process spawning sits behind [`ProcessExecutor`]
//! so tests can substitute [`fakes::ScriptedExecutor`].

pub mod compose;
pub mod config;
pub mod error;
pub mod fakes;
pub mod kubectl;
pub mod process;
pub mod telemetry;
pub mod validation;

pub use compose::ComposeRunner;
pub use config::{RunnerConfig, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT};
pub use error::{Error, ExecutionError, PreconditionError, Result};
pub use kubectl::{KubectlRunner, WaitTarget, STATUS_FAILURE_PREFIX};
pub use process::{CommandInvocation, CommandResult, ProcessExecutor, SystemExecutor};
pub use telemetry::init_tracing;
pub use validation::{manifest_files, Requirement, ValidationTarget, MANIFEST_EXTENSIONS};
