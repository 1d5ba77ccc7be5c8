//! Error types for forge-shell

use std::path::PathBuf;

/// Result type for shell operations
pub type Result<T> = std::result::Result<T, ExecutionError>;

/// A local command could not be run to successful completion.
///
/// Both variants carry the rendered command line so callers can surface a
/// self-contained message without re-deriving what was attempted.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to spawn `{command}` in {}: {source}", working_dir.display())]
    Spawn {
        command: String,
        working_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {}", exit_code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")), stderr.trim())]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl ExecutionError {
    /// Captured standard error of the failed command, if it ran at all.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            Self::Spawn { .. } => None,
        }
    }
}
