//! The source-host seam

use async_trait::async_trait;

use crate::types::{
    CommitSummary, CreatedPullRequest, MergeMethod, MergeOutcome, NewPullRequest,
    PullRequestSummary,
};
use crate::{HostError, Result};

/// Number of commits returned when the caller does not ask for a limit.
pub const DEFAULT_COMMIT_LIMIT: usize = 10;

/// Remote repository hosting operations.
///
/// Every call is a direct round-trip; failures are never retried and never
/// yield partial results.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Most recent commits, in the host's native newest-first order.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CommitSummary>>;

    /// Open pull requests, most recently updated first.
    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestSummary>>;

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestSummary>;

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        method: MergeMethod,
        message: Option<&str>,
    ) -> Result<MergeOutcome>;

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<CreatedPullRequest>;
}

/// Reject empty required arguments before anything goes over the wire.
pub fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HostError::Validation(format!("'{name}' must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_repo(owner: &str, repo: &str) -> Result<()> {
    require("owner", owner)?;
    require("repo", repo)
}
