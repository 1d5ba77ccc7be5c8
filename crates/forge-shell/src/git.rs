//! Git commands used by the server's local tools

use std::path::Path;

use crate::{CommandLine, Result, ShellRunner};

/// Git operations on one working tree, issued through a [`ShellRunner`].
pub struct Git<'a> {
    shell: &'a dyn ShellRunner,
    repo: &'a Path,
}

impl<'a> Git<'a> {
    pub fn new(shell: &'a dyn ShellRunner, repo: &'a Path) -> Self {
        Self { shell, repo }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = self
            .shell
            .run(self.repo, &CommandLine::git(args.iter().copied()))
            .await?;
        Ok(output.stdout)
    }

    /// Short-format working tree status.
    pub async fn status(&self) -> Result<String> {
        Ok(self.git(&["status", "--short"]).await?.trim_end().to_string())
    }

    /// Unstaged changes followed by staged changes.
    pub async fn diff(&self) -> Result<String> {
        let unstaged = self.git(&["diff"]).await?;
        let staged = self.git(&["diff", "--cached"]).await?;

        let mut diff = String::new();
        for part in [unstaged.trim_end(), staged.trim_end()] {
            if part.is_empty() {
                continue;
            }
            if !diff.is_empty() {
                diff.push('\n');
            }
            diff.push_str(part);
        }
        Ok(diff)
    }

    /// Stage exactly the given paths.
    pub async fn stage(&self, files: &[String]) -> Result<()> {
        let mut args = vec!["add", "--"];
        args.extend(files.iter().map(String::as_str));
        self.git(&args).await?;
        Ok(())
    }

    /// Stage every change in the working tree, including deletions.
    pub async fn stage_all(&self) -> Result<()> {
        self.git(&["add", "-A"]).await?;
        Ok(())
    }

    pub async fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-m", message]).await?;
        Ok(())
    }

    /// Name of the checked-out branch (`HEAD` when detached).
    pub async fn current_branch(&self) -> Result<String> {
        Ok(self
            .git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await?
            .trim()
            .to_string())
    }

    /// Full hash of the commit HEAD points at.
    pub async fn head_hash(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }
}
