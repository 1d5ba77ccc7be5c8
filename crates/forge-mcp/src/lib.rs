//! MCP server for GitHub and local git workflows
//!
//! Exposes a fixed set of resources, tools and prompts to Model Context
//! Protocol clients over Server-Sent Events or stdio.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client ]
//!        | (JSON-RPC over SSE or stdio)
//!        v
//! [ transport ] --> [ session registry ]      (SSE only)
//!        |
//!        v
//! [ McpServer ] --> [ CapabilityRegistry ] --> schema validation
//!                          |
//!                          +--> [ forge-host  (GitHub REST API) ]
//!                          +--> [ forge-shell (local git)      ]
//! ```
//!
//! # Resources
//!
//! - `github://{owner}/{repo}/commits[/{branch}]` - Recent commits
//! - `github://{owner}/{repo}/pulls` - Open pull requests
//! - `github://{owner}/{repo}/pulls/{number}` - One pull request
//!
//! # Tools
//!
//! - `generate-commit-message`, `commit-changes` - Local repository
//! - `merge-pull-request`, `create-pull-request` - Pull requests
//!
//! # Prompts
//!
//! - `commit-message` - Commit message request template

pub mod capabilities;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod schema;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use capabilities::{
    CapabilityContext, CapabilityDescriptor, CapabilityKind, CapabilityRegistry, Content,
    ContentKind, OperationRequest,
};
pub use config::{Config, Overrides, TransportKind};
pub use error::{Error, Result};
pub use lifecycle::{Outcome, Supervisor, TaskSpawner, shutdown_signal};
pub use server::McpServer;
pub use session::{RoutingError, SessionHandle, SessionInfo, SessionRegistry};
pub use tools::{ToolContent, ToolResult};
