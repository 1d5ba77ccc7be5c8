//! An in-memory source host.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use forge_host::{
    CommitSummary, CreatedPullRequest, HostError, MergeMethod, MergeOutcome, NewPullRequest,
    PullRequestSummary, SourceHost,
};

/// Serves canned data for a fixed set of repositories.
///
/// Unknown repositories answer with [`HostError::NotFound`], like the real
/// API. Every call is recorded as a short description for assertions.
#[derive(Default)]
pub struct StubHost {
    repos: HashSet<(String, String)>,
    commits: Vec<CommitSummary>,
    pulls: Vec<PullRequestSummary>,
    forbidden: bool,
    calls: Mutex<Vec<String>>,
}

impl StubHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, owner: &str, repo: &str) -> Self {
        self.repos.insert((owner.to_string(), repo.to_string()));
        self
    }

    /// Add `count` commits, newest first.
    pub fn with_commits(mut self, count: usize) -> Self {
        let base = epoch();
        self.commits = (0..count)
            .map(|i| CommitSummary {
                sha: format!("{:040x}", count - i),
                author: "Test User".to_string(),
                message: format!("commit {}", count - i),
                date: Some(base + Duration::minutes((count - i) as i64)),
            })
            .collect();
        self
    }

    pub fn with_pull(mut self, number: u64, title: &str, updated_minutes: i64) -> Self {
        let base = epoch();
        self.pulls.push(PullRequestSummary {
            number,
            title: title.to_string(),
            author: "octocat".to_string(),
            state: "open".to_string(),
            created_at: base,
            updated_at: base + Duration::minutes(updated_minutes),
            url: Some(format!("https://example.test/pull/{number}")),
        });
        self
    }

    /// Answer every call with a permission error.
    pub fn forbidden(mut self) -> Self {
        self.forbidden = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check(&self, call: String, owner: &str, repo: &str) -> Result<(), HostError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.forbidden {
            return Err(HostError::Permission("token lacks scope".to_string()));
        }
        if !self.repos.contains(&(owner.to_string(), repo.to_string())) {
            return Err(HostError::NotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }
        Ok(())
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[async_trait]
impl SourceHost for StubHost {
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, HostError> {
        self.check(
            format!("list_commits {owner}/{repo} branch={branch:?} limit={limit}"),
            owner,
            repo,
        )?;
        Ok(self.commits.iter().take(limit).cloned().collect())
    }

    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestSummary>, HostError> {
        self.check(format!("list_open_pull_requests {owner}/{repo}"), owner, repo)?;
        let mut pulls = self.pulls.clone();
        pulls.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(pulls)
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestSummary, HostError> {
        self.check(format!("get_pull_request {owner}/{repo}#{number}"), owner, repo)?;
        self.pulls
            .iter()
            .find(|p| p.number == number)
            .cloned()
            .ok_or_else(|| HostError::PullRequestNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
            })
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        method: MergeMethod,
        message: Option<&str>,
    ) -> Result<MergeOutcome, HostError> {
        self.check(
            format!("merge_pull_request {owner}/{repo}#{number} method={method} message={message:?}"),
            owner,
            repo,
        )?;
        Ok(MergeOutcome {
            sha: format!("merged{number}"),
            merged: true,
            message: "Pull Request successfully merged".to_string(),
        })
    }

    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<CreatedPullRequest, HostError> {
        self.check(
            format!(
                "create_pull_request {}/{} {}->{} title={:?} body={:?}",
                request.owner, request.repo, request.head, request.base, request.title, request.body
            ),
            &request.owner,
            &request.repo,
        )?;
        let number = 100;
        Ok(CreatedPullRequest {
            number,
            url: format!("https://example.test/{}/{}/pull/{number}", request.owner, request.repo),
        })
    }
}
