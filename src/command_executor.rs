use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ExecutionError;
use crate::types::BuildTask;

pub const DEFAULT_SHELL: &str = "bash";

/// Runs the local build step.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    async fn execute(
        &self,
        task: &BuildTask,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError>;
}

/// Runs the command through `<shell> -c` with stdout and stderr inherited,
/// so the user sees the build output as it happens.
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl CommandExecutor for ShellExecutor {
    async fn execute(
        &self,
        task: &BuildTask,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError> {
        if task.command.trim().is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }
        if !task.working_directory.is_dir() {
            return Err(ExecutionError::MissingDirectory(
                task.working_directory.clone(),
            ));
        }

        info!(
            "Running '{}' in {}",
            task.command,
            task.working_directory.display()
        );

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&task.command)
            .current_dir(&task.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutionError::SpawnFailed {
                shell: self.shell.clone(),
                source,
            })?;

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Build cancelled, killing process");
                let _ = child.kill().await;
                return Err(ExecutionError::Cancelled);
            }
            status = child.wait() => status.map_err(ExecutionError::WaitFailed)?,
        };

        debug!("Build process exited with {}", status);
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ExecutionError::NonZeroExit(code)),
            None => Err(ExecutionError::Terminated),
        }
    }
}
