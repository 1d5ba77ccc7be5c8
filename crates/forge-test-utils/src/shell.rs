//! A shell runner that records what it was asked to run.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use forge_shell::{CommandLine, CommandOutput, ExecutionError, ShellRunner, SystemShell};

/// Records every command, then delegates to [`SystemShell`].
///
/// Commands whose first argument matches one registered with
/// [`fail_on`](Self::fail_on) are recorded but not run, and fail with an
/// [`ExecutionError::Failed`].
#[derive(Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<(PathBuf, CommandLine)>>,
    failing: Vec<String>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command whose first argument is `subcommand` fail.
    pub fn fail_on(mut self, subcommand: &str) -> Self {
        self.failing.push(subcommand.to_string());
        self
    }

    /// Command lines issued so far, in order.
    pub fn commands(&self) -> Vec<CommandLine> {
        self.lock().iter().map(|(_, cmd)| cmd.clone()).collect()
    }

    /// Command lines rendered as strings, in order.
    pub fn rendered(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    /// Working directories the commands ran in, in order.
    pub fn working_dirs(&self) -> Vec<PathBuf> {
        self.lock().iter().map(|(dir, _)| dir.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PathBuf, CommandLine)>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ShellRunner for RecordingShell {
    async fn run(
        &self,
        working_dir: &Path,
        command: &CommandLine,
    ) -> Result<CommandOutput, ExecutionError> {
        self.lock()
            .push((working_dir.to_path_buf(), command.clone()));

        if let Some(first) = command.args.first()
            && self.failing.iter().any(|f| f == first)
        {
            return Err(ExecutionError::Failed {
                command: command.to_string(),
                exit_code: Some(1),
                stderr: format!("injected failure for `{first}`"),
            });
        }

        SystemShell::new().run(working_dir, command).await
    }
}
