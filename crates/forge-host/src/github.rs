//! GitHub REST API client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::host::{require, require_repo};
use crate::types::{
    CommitSummary, CreatedPullRequest, MergeMethod, MergeOutcome, NewPullRequest,
    PullRequestSummary,
};
use crate::{HostError, Result, SourceHost};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Largest page the API serves.
const MAX_PER_PAGE: usize = 100;

const API_VERSION: &str = "2022-11-28";

/// Authenticated client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    /// Create a client against a custom endpoint (GitHub Enterprise, test servers).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| HostError::remote(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, owner, repo, path)
    }

    /// Send a request and decode a successful JSON body, classifying failures.
    ///
    /// `pull` names the pull request the URL addresses, so a 404 can say
    /// which object is missing.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        owner: &str,
        repo: &str,
        pull: Option<u64>,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("forge-mcp/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| HostError::remote(format!("failed to decode response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify(status, &body, owner, repo, pull);
        tracing::debug!(%status, owner, repo, error = %err, "GitHub request failed");
        Err(err)
    }
}

/// Map a non-success status to the adapter's error taxonomy.
fn classify(
    status: StatusCode,
    body: &str,
    owner: &str,
    repo: &str,
    pull: Option<u64>,
) -> HostError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::NOT_FOUND => match pull {
            Some(number) => HostError::PullRequestNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
            },
            None => HostError::NotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            },
        },
        StatusCode::FORBIDDEN => HostError::Permission(if message.is_empty() {
            format!("access to {owner}/{repo} was refused")
        } else {
            message
        }),
        _ => HostError::Remote {
            status: Some(status.as_u16()),
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        },
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CommitSummary>> {
        require_repo(owner, repo)?;

        let per_page = limit.clamp(1, MAX_PER_PAGE).to_string();
        let mut query = vec![("per_page", per_page)];
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            query.push(("sha", branch.to_string()));
        }

        let request = self.http.get(self.repo_url(owner, repo, "/commits")).query(&query);
        let commits: Vec<ApiCommit> = self.send(request, owner, repo, None).await?;

        Ok(commits.into_iter().take(limit).map(Into::into).collect())
    }

    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestSummary>> {
        require_repo(owner, repo)?;

        let request = self.http.get(self.repo_url(owner, repo, "/pulls")).query(&[
            ("state", "open"),
            ("sort", "updated"),
            ("direction", "desc"),
        ]);
        let pulls: Vec<ApiPullRequest> = self.send(request, owner, repo, None).await?;

        Ok(pulls.into_iter().map(Into::into).collect())
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestSummary> {
        require_repo(owner, repo)?;

        let request = self
            .http
            .get(self.repo_url(owner, repo, &format!("/pulls/{number}")));
        let pull: ApiPullRequest = self.send(request, owner, repo, Some(number)).await?;

        Ok(pull.into())
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        method: MergeMethod,
        message: Option<&str>,
    ) -> Result<MergeOutcome> {
        require_repo(owner, repo)?;

        let mut body = json!({ "merge_method": method.as_str() });
        if let Some(message) = message {
            body["commit_message"] = json!(message);
        }

        let request = self
            .http
            .put(self.repo_url(owner, repo, &format!("/pulls/{number}/merge")))
            .json(&body);
        let merge: ApiMerge = self.send(request, owner, repo, Some(number)).await?;

        Ok(MergeOutcome {
            sha: merge.sha,
            merged: merge.merged,
            message: merge.message,
        })
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<CreatedPullRequest> {
        require_repo(&request.owner, &request.repo)?;
        require("title", &request.title)?;
        require("head", &request.head)?;
        require("base", &request.base)?;

        let mut body = json!({
            "title": request.title,
            "head": request.head,
            "base": request.base,
        });
        if let Some(text) = &request.body {
            body["body"] = json!(text);
        }

        let http_request = self
            .http
            .post(self.repo_url(&request.owner, &request.repo, "/pulls"))
            .json(&body);
        let created: ApiPullRequest = self
            .send(http_request, &request.owner, &request.repo, None)
            .await?;

        Ok(CreatedPullRequest {
            number: created.number,
            url: created.html_url.unwrap_or_default(),
        })
    }
}

// ============================================================================
// Wire formats
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    author: Option<ApiCommitAuthor>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitDetail,
    author: Option<ApiUser>,
}

impl From<ApiCommit> for CommitSummary {
    fn from(c: ApiCommit) -> Self {
        let (name, date) = match c.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        Self {
            sha: c.sha,
            author: name
                .or_else(|| c.author.map(|u| u.login))
                .unwrap_or_else(|| "unknown".to_string()),
            message: c.commit.message,
            date,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    user: Option<ApiUser>,
    #[serde(default)]
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    html_url: Option<String>,
}

impl From<ApiPullRequest> for PullRequestSummary {
    fn from(p: ApiPullRequest) -> Self {
        Self {
            number: p.number,
            title: p.title,
            author: p
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "unknown".to_string()),
            state: p.state,
            created_at: p.created_at,
            updated_at: p.updated_at,
            url: p.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMerge {
    sha: String,
    merged: bool,
    message: String,
}
