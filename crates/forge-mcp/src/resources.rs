//! MCP resources
//!
//! Read-only views of a hosted repository, addressed by templated URIs.
//!
//! # Available Resources
//!
//! | URI template | Capability | Content |
//! |--------------|------------|---------|
//! | `github://{owner}/{repo}/commits` | `commits` | 10 most recent commits |
//! | `github://{owner}/{repo}/commits/{branch}` | `commits` | same, on `branch` |
//! | `github://{owner}/{repo}/pulls` | `pulls` | open pull requests, last updated first |
//! | `github://{owner}/{repo}/pulls/{number}` | `pull` | one pull request |
//!
//! The last variable of a template captures the rest of the URI, so branch
//! names containing `/` resolve.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::capabilities::{
    CapabilityContext, CapabilityDescriptor, CapabilityKind, Content, HandlerFuture,
};
use crate::schema::{Arguments, Field, FieldType, InputSchema};
use crate::{Error, Result};
use forge_host::DEFAULT_COMMIT_LIMIT;

/// URI scheme of every resource.
pub const SCHEME: &str = "github";

/// A family of resource URIs served by one capability.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    #[serde(skip)]
    pub capability: &'static str,
}

pub const TEMPLATES: &[ResourceTemplate] = &[
    ResourceTemplate {
        uri_template: "github://{owner}/{repo}/commits",
        name: "commits",
        description: "The 10 most recent commits on the default branch",
        mime_type: "application/json",
        capability: "commits",
    },
    ResourceTemplate {
        uri_template: "github://{owner}/{repo}/commits/{branch}",
        name: "branch-commits",
        description: "The 10 most recent commits on a branch",
        mime_type: "application/json",
        capability: "commits",
    },
    ResourceTemplate {
        uri_template: "github://{owner}/{repo}/pulls",
        name: "pulls",
        description: "Open pull requests, most recently updated first",
        mime_type: "application/json",
        capability: "pulls",
    },
    ResourceTemplate {
        uri_template: "github://{owner}/{repo}/pulls/{number}",
        name: "pull",
        description: "A single pull request",
        mime_type: "application/json",
        capability: "pull",
    },
];

const REPO_FIELDS: &[Field] = &[
    Field::required("owner", FieldType::String, "Repository owner"),
    Field::required("repo", FieldType::String, "Repository name"),
];

const COMMITS_FIELDS: &[Field] = &[
    Field::required("owner", FieldType::String, "Repository owner"),
    Field::required("repo", FieldType::String, "Repository name"),
    Field::optional("branch", FieldType::String, "Branch to list (defaults to the default branch)"),
];

const PULL_FIELDS: &[Field] = &[
    Field::required("owner", FieldType::String, "Repository owner"),
    Field::required("repo", FieldType::String, "Repository name"),
    Field::required("number", FieldType::Integer, "Pull request number"),
];

/// Resource capability descriptors.
pub fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor {
            name: "commits",
            kind: CapabilityKind::Resource,
            description: "Recent commits of a repository",
            schema: InputSchema::new(COMMITS_FIELDS),
            handler: read_commits,
        },
        CapabilityDescriptor {
            name: "pulls",
            kind: CapabilityKind::Resource,
            description: "Open pull requests of a repository",
            schema: InputSchema::new(REPO_FIELDS),
            handler: read_pulls,
        },
        CapabilityDescriptor {
            name: "pull",
            kind: CapabilityKind::Resource,
            description: "One pull request of a repository",
            schema: InputSchema::new(PULL_FIELDS),
            handler: read_pull,
        },
    ]
}

/// Resolve a resource URI to its capability name and arguments.
///
/// # Errors
///
/// Returns `Error::UnknownResource` if the URI matches no template.
pub fn resolve_uri(uri: &str) -> Result<(&'static str, Value)> {
    let unknown = || Error::UnknownResource(uri.to_string());

    let rest = uri
        .strip_prefix(SCHEME)
        .and_then(|r| r.strip_prefix("://"))
        .ok_or_else(unknown)?;
    let segments: Vec<&str> = rest.split('/').collect();

    TEMPLATES
        .iter()
        .find_map(|t| match_template(t.uri_template, &segments).map(|args| (t.capability, args)))
        .ok_or_else(unknown)
}

fn match_template(template: &str, segments: &[&str]) -> Option<Value> {
    let pattern: Vec<&str> = template
        .strip_prefix(SCHEME)?
        .strip_prefix("://")?
        .split('/')
        .collect();

    if segments.len() < pattern.len() {
        return None;
    }

    let mut captured = Map::new();
    for (i, part) in pattern.iter().enumerate() {
        let last = i + 1 == pattern.len();
        match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some(var) => {
                let value = if last {
                    segments[i..].join("/")
                } else {
                    segments[i].to_string()
                };
                if value.is_empty() || value.split('/').any(str::is_empty) {
                    return None;
                }
                captured.insert(var.to_string(), Value::String(value));
            }
            None => {
                if segments[i] != *part {
                    return None;
                }
                if last && segments.len() != pattern.len() {
                    return None;
                }
            }
        }
    }

    Some(Value::Object(captured))
}

fn read_commits(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let owner = args.require_str("owner")?;
        let repo = args.require_str("repo")?;
        let branch = args.get_non_empty("branch");

        let commits = ctx
            .host
            .list_commits(owner, repo, branch, DEFAULT_COMMIT_LIMIT)
            .await?;

        Ok(vec![Content::json(&commits)?])
    })
}

fn read_pulls(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let owner = args.require_str("owner")?;
        let repo = args.require_str("repo")?;

        let mut pulls = ctx.host.list_open_pull_requests(owner, repo).await?;
        // Stable: a host that honours sort=updated keeps its own tie order.
        pulls.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(vec![Content::json(&pulls)?])
    })
}

fn read_pull(ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let owner = args.require_str("owner")?;
        let repo = args.require_str("repo")?;
        let number = args.require_u64("number")?;

        let pull = ctx.host.get_pull_request(owner, repo, number).await?;

        Ok(vec![Content::json(&pull)?])
    })
}
