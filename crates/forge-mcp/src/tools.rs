//! MCP tools
//!
//! Tools are the operations that act: on the source host (pull requests) or
//! on a local working tree (commits).
//!
//! # Tools
//!
//! - `generate-commit-message` - Build a commit-message prompt from changes
//!   or from a repository's uncommitted work
//! - `merge-pull-request` - Merge a pull request
//! - `create-pull-request` - Open a pull request
//! - `commit-changes` - Stage and commit local changes
//!
//! Tool failures are reported to the client as tool results flagged with
//! `isError`, not as protocol errors.

use std::path::Path;

use forge_host::{MergeMethod, NewPullRequest};
use forge_shell::Git;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::capabilities::{
    CapabilityContext, CapabilityDescriptor, CapabilityKind, Content, HandlerFuture,
};
use crate::prompts::commit_message_prompt;
use crate::schema::{Arguments, Field, FieldType, InputSchema, ValidationError};
use crate::{Error, Result};

/// Result from a tool invocation, in MCP wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content types for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful result from handler output
    pub fn from_content(content: Vec<Content>) -> Self {
        Self {
            content: content
                .into_iter()
                .map(|c| ToolContent::Text { text: c.text })
                .collect(),
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }
}

const GENERATE_COMMIT_MESSAGE_FIELDS: &[Field] = &[
    Field::optional("changes", FieldType::String, "Description or diff of the changes"),
    Field::optional("context", FieldType::String, "Additional context about the changes"),
    Field::optional(
        "repoPath",
        FieldType::String,
        "Local repository to read uncommitted changes from when 'changes' is omitted",
    ),
];

const MERGE_PULL_REQUEST_FIELDS: &[Field] = &[
    Field::required("owner", FieldType::String, "Repository owner"),
    Field::required("repo", FieldType::String, "Repository name"),
    Field::required("pullNumber", FieldType::Integer, "Pull request number"),
    Field::optional(
        "mergeMethod",
        FieldType::Enum(&MergeMethod::ALL),
        "Merge strategy (defaults to merge)",
    ),
    Field::optional("commitMessage", FieldType::String, "Message for the merge commit"),
];

const CREATE_PULL_REQUEST_FIELDS: &[Field] = &[
    Field::required("owner", FieldType::String, "Repository owner"),
    Field::required("repo", FieldType::String, "Repository name"),
    Field::required("title", FieldType::String, "Pull request title"),
    Field::required("head", FieldType::String, "Branch containing the changes"),
    Field::required("base", FieldType::String, "Branch to merge into"),
    Field::optional("body", FieldType::String, "Pull request description"),
];

const COMMIT_CHANGES_FIELDS: &[Field] = &[
    Field::required("repoPath", FieldType::String, "Local repository path"),
    Field::required("message", FieldType::String, "Commit message"),
    Field::optional(
        "files",
        FieldType::StringArray,
        "Paths to stage (defaults to every change)",
    ),
];

/// Tool capability descriptors.
pub fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor {
            name: "generate-commit-message",
            kind: CapabilityKind::Tool,
            description: "Build a prompt asking for a commit message describing the given or uncommitted changes",
            schema: InputSchema::new(GENERATE_COMMIT_MESSAGE_FIELDS),
            handler: generate_commit_message,
        },
        CapabilityDescriptor {
            name: "merge-pull-request",
            kind: CapabilityKind::Tool,
            description: "Merge a pull request",
            schema: InputSchema::new(MERGE_PULL_REQUEST_FIELDS),
            handler: merge_pull_request,
        },
        CapabilityDescriptor {
            name: "create-pull-request",
            kind: CapabilityKind::Tool,
            description: "Open a new pull request",
            schema: InputSchema::new(CREATE_PULL_REQUEST_FIELDS),
            handler: create_pull_request,
        },
        CapabilityDescriptor {
            name: "commit-changes",
            kind: CapabilityKind::Tool,
            description: "Stage files (or everything) and commit them in a local repository",
            schema: InputSchema::new(COMMIT_CHANGES_FIELDS),
            handler: commit_changes,
        },
    ]
}

// ============================================================================
// Local Repository Tools
// ============================================================================

/// Handle generate-commit-message - Returns prompt text, never a message
fn generate_commit_message(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let changes = match (args.get_non_empty("changes"), args.get_non_empty("repoPath")) {
            (Some(changes), _) => changes.to_string(),
            (None, Some(repo_path)) => describe_uncommitted(ctx, Path::new(repo_path)).await?,
            (None, None) => {
                return Err(ValidationError::Rule(
                    "either 'changes' or 'repoPath' must be provided".to_string(),
                )
                .into());
            }
        };

        let prompt = commit_message_prompt(&changes, args.get_str("context"));
        Ok(vec![Content::text(prompt)])
    })
}

/// Summarise a working tree's status and diff.
async fn describe_uncommitted(ctx: &CapabilityContext, repo_path: &Path) -> Result<String> {
    let git = Git::new(ctx.shell.as_ref(), repo_path);
    let status = git.status().await?;
    let diff = git.diff().await?;

    if status.is_empty() && diff.is_empty() {
        return Err(ValidationError::Rule(format!(
            "no uncommitted changes in {}",
            repo_path.display()
        ))
        .into());
    }

    let mut summary = format!("Status:\n{status}\n");
    if !diff.is_empty() {
        summary.push_str("\nDiff:\n");
        summary.push_str(&diff);
        summary.push('\n');
    }
    Ok(summary)
}

/// Handle commit-changes - Stage, commit, then resolve the new HEAD
///
/// Each step runs only after the previous one succeeded.
fn commit_changes(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let repo_path = Path::new(args.require_str("repoPath")?);
        let message = args.require_str("message")?;
        let files = args.get_str_list("files").filter(|f| !f.is_empty());

        let git = Git::new(ctx.shell.as_ref(), repo_path);
        match &files {
            Some(files) => git.stage(files).await?,
            None => git.stage_all().await?,
        }
        git.commit(message).await?;
        let commit = git.head_hash().await?;
        let branch = git.current_branch().await?;

        tracing::info!(repo = %repo_path.display(), %commit, %branch, "Committed changes");

        Ok(vec![Content::json(&json!({
            "commit": commit,
            "branch": branch,
        }))?])
    })
}

// ============================================================================
// Pull Request Tools
// ============================================================================

/// Handle merge-pull-request - Merge via the source host
fn merge_pull_request(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let owner = args.require_str("owner")?;
        let repo = args.require_str("repo")?;
        let number = args.require_u64("pullNumber")?;
        let method = match args.get_str("mergeMethod") {
            Some(method) => method.parse::<MergeMethod>().map_err(Error::Host)?,
            None => MergeMethod::default(),
        };
        let message = args.get_str("commitMessage");

        let outcome = ctx
            .host
            .merge_pull_request(owner, repo, number, method, message)
            .await?;

        Ok(vec![Content::json(&outcome)?])
    })
}

/// Handle create-pull-request - Open a pull request via the source host
fn create_pull_request(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let request = NewPullRequest {
            owner: args.require_str("owner")?.to_string(),
            repo: args.require_str("repo")?.to_string(),
            title: args.require_str("title")?.to_string(),
            body: args.get_str("body").map(str::to_string),
            head: args.require_str("head")?.to_string(),
            base: args.require_str("base")?.to_string(),
        };

        let created = ctx.host.create_pull_request(&request).await?;

        Ok(vec![Content::json(&created)?])
    })
}
