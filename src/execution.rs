use crate::error::CiError;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{error, info};

/// What a single external command invocation produced.
///
/// `output` holds stdout when the command succeeded and stderr (or a
/// synthesized message) when it did not.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub success: bool,
    pub output: String,
    pub duration: f64,
}

impl CommandOutcome {
    fn failure(output: String, start_time: Instant) -> Self {
        Self {
            success: false,
            output,
            duration: start_time.elapsed().as_secs_f64(),
        }
    }
}

pub fn timeout_message(timeout: Duration) -> String {
    format!("Timeout after {}s", timeout.as_secs_f64())
}

#[derive(Debug, Clone)]
pub struct CommandExecutor {
    working_dir: PathBuf,
}

impl CommandExecutor {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Runs `command` to completion or until `timeout` elapses.
    ///
    /// Never fails: launch errors, nonzero exits and timeouts are all
    /// reported through [`CommandOutcome::success`]. A timed out child is
    /// killed.
    pub async fn execute(&self, command: &[String], timeout: Duration) -> CommandOutcome {
        let start_time = Instant::now();
        let command_line = command.join(" ");
        info!("Executing: {}", command_line);

        let Some((program, args)) = command.split_first() else {
            error!("Command error: empty command line");
            return CommandOutcome::failure("empty command line".to_string(), start_time);
        };

        let child = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let outcome = CommandOutcome::failure(e.to_string(), start_time);
                error!("Command error after {:.2}s: {}: {}", outcome.duration, command_line, e);
                return outcome;
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let duration = start_time.elapsed().as_secs_f64();

                if output.status.success() {
                    info!("Command succeeded in {:.2}s", duration);
                    return CommandOutcome {
                        success: true,
                        output: String::from_utf8_lossy(&output.stdout).into_owned(),
                        duration,
                    };
                }

                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let message = if stderr.trim().is_empty() {
                    format!("Command `{}` exited with {}", command_line, output.status)
                } else {
                    stderr
                };
                error!("Command failed after {:.2}s: {}", duration, message.trim_end());

                CommandOutcome {
                    success: false,
                    output: message,
                    duration,
                }
            }
            Ok(Err(e)) => {
                let outcome = CommandOutcome::failure(e.to_string(), start_time);
                error!("Command error after {:.2}s: {}: {}", outcome.duration, command_line, e);
                outcome
            }
            Err(_) => {
                let outcome = CommandOutcome::failure(timeout_message(timeout), start_time);
                error!(
                    "Command timed out after {}s (ran {:.2}s): {}",
                    timeout.as_secs_f64(),
                    outcome.duration,
                    command_line
                );
                outcome
            }
        }
    }

    /// Runs `command` attached to the caller's terminal, without a timeout.
    pub async fn run_inherited(&self, command: &[String]) -> Result<ExitStatus, CiError> {
        let command_line = command.join(" ");
        info!("Executing: {}", command_line);

        let (program, args) = command.split_first().ok_or_else(|| CiError::Spawn {
            command: command_line.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        })?;

        Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .status()
            .await
            .map_err(|source| CiError::Spawn {
                command: command_line,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_format() {
        assert_eq!(timeout_message(Duration::from_secs(120)), "Timeout after 120s");
        assert_eq!(timeout_message(Duration::from_millis(200)), "Timeout after 0.2s");
    }
}
