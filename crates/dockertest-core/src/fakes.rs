//! In-memory fakes for the process seam (testing only)
//!
//! `ScriptedExecutor` records every [`CommandInvocation`] it receives and
//! answers with queued outcomes instead of spawning processes.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::process::{CommandInvocation, CommandResult, ProcessExecutor};

#[derive(Debug)]
enum Scripted {
    Finished(CommandResult),
    SpawnFailure,
}

/// Executor that replays queued results in FIFO order.
///
/// Once the queue is empty every call succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    queue: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<CommandInvocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next call.
    pub fn push_result(&self, result: CommandResult) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Scripted::Finished(result));
    }

    /// Queue a "program not found" spawn failure for the next call.
    pub fn push_spawn_failure(&self) {
        self.queue.lock().unwrap().push_back(Scripted::SpawnFailure);
    }

    /// Every invocation received so far, oldest first.
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.seen.lock().unwrap().clone()
    }
}

impl ProcessExecutor for ScriptedExecutor {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandResult> {
        self.seen.lock().unwrap().push(invocation.clone());

        match self.queue.lock().unwrap().pop_front() {
            Some(Scripted::Finished(result)) => Ok(result),
            Some(Scripted::SpawnFailure) => Err(Error::Spawn {
                program: invocation
                    .program()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            }),
            None => Ok(CommandResult::new(0, "")),
        }
    }
}
