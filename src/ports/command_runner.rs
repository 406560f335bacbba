use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Exit code recorded for a command killed by its timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run through non-interactive sudo
    pub fn with_sudo(self) -> Self {
        let mut args = vec!["-n".to_string(), self.program];
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished (or timed-out) command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Port for running external commands with a wall-clock bound
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Run to completion or until `timeout`.
    ///
    /// On timeout the child is killed, lines captured so far are kept,
    /// `timed_out` is set and the exit code is [`TIMEOUT_EXIT_CODE`].
    async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<CommandOutput, CommandError>;

    /// Start [`run`](Self::run) on its own task and hand back the join handle
    fn spawn(
        self: Arc<Self>,
        command: CommandSpec,
        timeout: Duration,
    ) -> JoinHandle<Result<CommandOutput, CommandError>> {
        tokio::spawn(async move { self.run(&command, timeout).await })
    }
}
