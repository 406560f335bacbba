use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::ports::{CommandError, CommandOutput, CommandRunner, CommandSpec, TIMEOUT_EXIT_CODE};

/// Command runner on tokio processes, bounded by a concurrency limit
pub struct TokioCommandRunner {
    permits: Arc<Semaphore>,
}

impl TokioCommandRunner {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<CommandOutput, CommandError> {
        // The semaphore is never closed
        let _permit = self.permits.acquire().await.map_err(|e| {
            CommandError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let mut stdout_lines = Vec::new();
        let mut stderr_lines = Vec::new();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let out_buf = &mut stdout_lines;
        let err_buf = &mut stderr_lines;
        let child_ref = &mut child;
        let collect = async move {
            let read_out = async move {
                if let Some(stdout) = stdout {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        out_buf.push(line);
                    }
                }
            };
            let read_err = async move {
                if let Some(stderr) = stderr {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        err_buf.push(line);
                    }
                }
            };
            tokio::join!(read_out, read_err);
            child_ref.wait().await
        };

        let result = tokio::time::timeout(timeout, collect).await;
        match result {
            Ok(status) => {
                let status = status?;
                let exit_code = status.code().unwrap_or(-1);
                debug!("`{}` exited with {}", command, exit_code);
                Ok(CommandOutput {
                    exit_code,
                    stdout: stdout_lines,
                    stderr: stderr_lines,
                    timed_out: false,
                })
            }
            Err(_) => {
                warn!("`{}` timed out after {:?}", command, timeout);
                if let Err(e) = child.kill().await {
                    debug!("Failed to kill `{}`: {}", command, e);
                }
                Ok(CommandOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: stdout_lines,
                    stderr: stderr_lines,
                    timed_out: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let runner = TokioCommandRunner::new(2);
        let cmd = CommandSpec::new("sh").arg("-c").arg("echo one; echo two; echo oops >&2; exit 3");
        let out = runner.run(&cmd, Duration::from_secs(5)).await.unwrap();
        assert_eq!(out.stdout, vec!["one", "two"]);
        assert_eq!(out.stderr, vec!["oops"]);
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let runner = TokioCommandRunner::new(1);
        let cmd = CommandSpec::new("sh").arg("-c").arg("echo early; sleep 5; echo late");
        let out = runner.run(&cmd, Duration::from_millis(500)).await.unwrap();
        assert!(out.timed_out);
        assert_eq!(out.exit_code, TIMEOUT_EXIT_CODE);
        assert_eq!(out.stdout, vec!["early"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let runner = Arc::new(TokioCommandRunner::new(2));
        let sleep = CommandSpec::new("sh").arg("-c").arg("sleep 0.3");
        let started = std::time::Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| Arc::clone(&runner).spawn(sleep.clone(), Duration::from_secs(5)))
            .collect();
        for joined in futures::future::join_all(handles).await {
            assert!(joined.unwrap().unwrap().success());
        }
        // Two permits: the third command waits for a full slot
        assert!(started.elapsed() >= Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_spawned_run_is_joinable() {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new(1));
        let cmd = CommandSpec::new("sh").arg("-c").arg("echo done");
        let out = runner.spawn(cmd, Duration::from_secs(5)).await.unwrap().unwrap();
        assert_eq!(out.stdout, vec!["done"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = TokioCommandRunner::new(1);
        let cmd = CommandSpec::new("/nonexistent/statblk-test-binary");
        let err = runner.run(&cmd, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
