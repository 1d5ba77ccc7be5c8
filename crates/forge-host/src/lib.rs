//! Source-host adapter for forge-mcp
//!
//! A thin call-through to the hosting service's REST API. The [`SourceHost`]
//! trait is the seam the capability handlers depend on; [`GitHubClient`] is
//! the production implementation.
//!
//! The adapter adds no business logic beyond argument validation and error
//! classification:
//!
//! | Remote status | Error |
//! |---------------|-------|
//! | 404 | [`HostError::NotFound`], or [`HostError::PullRequestNotFound`] when the URL names a pull request |
//! | 403 | [`HostError::Permission`] |
//! | anything else | [`HostError::Remote`] |

pub mod error;
pub mod github;
pub mod host;
pub mod types;

pub use error::{HostError, Result};
pub use github::{DEFAULT_API_URL, GitHubClient};
pub use host::{DEFAULT_COMMIT_LIMIT, SourceHost};
pub use types::{
    CommitSummary, CreatedPullRequest, MergeMethod, MergeOutcome, NewPullRequest,
    PullRequestSummary,
};
