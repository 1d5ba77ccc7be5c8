//! Command execution
//!
//! Commands are argv vectors, never shell strings: commit messages and file
//! names reach the child process verbatim, without quoting rules to get wrong.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{ExecutionError, Result};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Shorthand for a `git` invocation.
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git").args(args)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs commands inside a working directory.
///
/// Implementations must not retry: git state mutation is not idempotent.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    async fn run(&self, working_dir: &Path, command: &CommandLine) -> Result<CommandOutput>;
}

/// Runs each command as a fresh child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShellRunner for SystemShell {
    async fn run(&self, working_dir: &Path, command: &CommandLine) -> Result<CommandOutput> {
        tracing::debug!(cwd = %working_dir.display(), command = %command, "Running command");

        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecutionError::Spawn {
                command: command.to_string(),
                working_dir: working_dir.to_path_buf(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            tracing::debug!(
                command = %command,
                status = ?output.status.code(),
                stderr = %stderr.trim(),
                "Command failed"
            );
            // git reports some failures ("nothing to commit") on stdout only
            let stderr = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(ExecutionError::Failed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_whitespace() {
        let cmd = CommandLine::git(["commit", "-m", "fix the thing"]);
        assert_eq!(cmd.to_string(), r#"git commit -m "fix the thing""#);
    }

    #[test]
    fn display_plain_arguments() {
        let cmd = CommandLine::git(["rev-parse", "HEAD"]);
        assert_eq!(cmd.to_string(), "git rev-parse HEAD");
    }

    #[test]
    fn builder_appends_in_order() {
        let cmd = CommandLine::new("git").arg("add").args(["--", "a.txt"]);
        assert_eq!(cmd.program, "git");
        assert_eq!(cmd.args, vec!["add", "--", "a.txt"]);
    }

    #[tokio::test]
    async fn spawn_failure_is_execution_error() {
        let dir = std::env::temp_dir();
        let cmd = CommandLine::new("definitely-not-a-real-binary-forge");
        let err = SystemShell::new().run(&dir, &cmd).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-real-binary-forge"));
    }
}
