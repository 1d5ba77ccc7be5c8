//! Git repository fixtures.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// A real git repository with one commit on `main`, deleted on drop.
pub struct TempRepo {
    dir: TempDir,
}

impl TempRepo {
    /// Initialises a repository with an initial commit using the `git` CLI.
    ///
    /// Specifically:
    /// - Runs `git init`
    /// - Configures `user.email`, `user.name`, and `commit.gpgsign = false`
    /// - Creates `README.md` and makes an initial commit
    /// - Renames the default branch to `main`
    ///
    /// # Panics
    /// Panics if any git operation fails.
    pub fn with_commit() -> Self {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("TempRepo: failed to create dir: {e}"));
        let repo = Self { dir };

        repo.git(&["init"]);
        repo.git(&["config", "user.email", "test@test.com"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo.write("README.md", "# Test");
        repo.git(&["add", "."]);
        repo.git(&["commit", "-m", "Initial commit"]);
        // Best-effort: older git versions may not support this flag
        let _ = Command::new("git")
            .args(["branch", "-m", "main"])
            .current_dir(repo.path())
            .output();

        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the repository root.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("TempRepo: failed to create {}: {e}", parent.display()));
        }
        fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("TempRepo: failed to write {}: {e}", path.display()));
    }

    /// Run a git command in the repository and return its trimmed stdout.
    ///
    /// # Panics
    /// Panics if the command cannot be spawned or exits non-zero.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .unwrap_or_else(|e| panic!("TempRepo: failed to run `git {args:?}`: {e}"));
        if !output.status.success() {
            panic!(
                "TempRepo: `git {args:?}` failed:\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Paths changed by the HEAD commit.
    pub fn files_in_head(&self) -> Vec<String> {
        self.git(&["show", "--name-only", "--pretty=format:", "HEAD"])
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Full hash of HEAD, read through `git2` independently of the CLI.
///
/// # Panics
/// Panics if the repository cannot be opened or HEAD does not resolve.
pub fn head_hash(path: &Path) -> String {
    let repo = git2::Repository::open(path)
        .unwrap_or_else(|e| panic!("head_hash: failed to open {}: {e}", path.display()));
    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .unwrap_or_else(|e| panic!("head_hash: failed to resolve HEAD: {e}"));
    head.id().to_string()
}
