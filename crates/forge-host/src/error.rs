//! Error types for forge-host

/// Result type for source-host operations
pub type Result<T> = std::result::Result<T, HostError>;

/// Errors surfaced by a [`SourceHost`](crate::SourceHost) call
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A required argument was missing or malformed; nothing was sent.
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("repository {owner}/{repo} not found")]
    NotFound { owner: String, repo: String },

    /// The repository exists but has no pull request with that number.
    #[error("pull request {owner}/{repo}#{number} not found")]
    PullRequestNotFound {
        owner: String,
        repo: String,
        number: u64,
    },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("remote API error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        status: Option<u16>,
        message: String,
    },
}

impl HostError {
    /// Either flavour of missing remote object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::PullRequestNotFound { .. })
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
