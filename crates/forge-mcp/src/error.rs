//! Error types for the MCP server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use forge_host::HostError;
use thiserror::Error;

use crate::capabilities::CapabilityKind;
use crate::schema::ValidationError;
use crate::session::RoutingError;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MCP server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Arguments did not match the capability's declared schema
    #[error("invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    /// A local command failed
    #[error(transparent)]
    Execution(#[from] forge_shell::ExecutionError),

    /// The source host rejected or failed a call
    #[error(transparent)]
    Host(#[from] HostError),

    /// A message named a session that does not exist
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// No capability of that kind and name is registered
    #[error("unknown {kind}: {name}")]
    UnknownCapability { kind: CapabilityKind, name: String },

    /// A resource URI matched none of the templates
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Missing or invalid startup configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server failure
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Name of the error class, as reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::Host(HostError::Validation(_)) => "ValidationError",
            Self::Execution(_) => "ExecutionError",
            Self::Host(HostError::NotFound { .. } | HostError::PullRequestNotFound { .. }) => {
                "NotFoundError"
            }
            Self::Host(HostError::Permission(_)) => "PermissionError",
            Self::Host(HostError::Remote { .. }) => "RemoteError",
            Self::Routing(_) => "RoutingError",
            Self::UnknownCapability { .. } | Self::UnknownResource(_) => "NotFoundError",
            Self::Config(_) => "ConfigError",
            Self::Json(_) | Self::Io(_) | Self::Server(_) => "InternalError",
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == "ValidationError"
    }

    /// JSON-RPC error code for this failure.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::Json(_) => -32700,
            Self::Validation(_)
            | Self::Host(HostError::Validation(_))
            | Self::UnknownCapability { .. }
            | Self::UnknownResource(_) => -32602,
            Self::Host(host) if host.is_not_found() => -32002,
            _ => -32603,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Routing(_) | Self::Validation(_) | Self::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_errors_keep_their_class() {
        let err = Error::from(HostError::NotFound {
            owner: "o".into(),
            repo: "r".into(),
        });
        assert_eq!(err.kind(), "NotFoundError");
        assert_eq!(err.rpc_code(), -32002);
        assert_eq!(err.to_string(), "repository o/r not found");

        let err = Error::from(HostError::PullRequestNotFound {
            owner: "o".into(),
            repo: "r".into(),
            number: 9,
        });
        assert_eq!(err.kind(), "NotFoundError");
        assert_eq!(err.rpc_code(), -32002);
        assert_eq!(err.to_string(), "pull request o/r#9 not found");

        let err = Error::from(HostError::Permission("denied".into()));
        assert_eq!(err.kind(), "PermissionError");

        let err = Error::from(HostError::remote("boom"));
        assert_eq!(err.kind(), "RemoteError");
        assert_eq!(err.rpc_code(), -32603);
    }

    #[test]
    fn host_validation_is_validation_class() {
        let err = Error::from(HostError::Validation("'owner' must not be empty".into()));
        assert!(err.is_validation());
        assert_eq!(err.rpc_code(), -32602);
    }

    #[test]
    fn routing_error_is_client_error() {
        let err = Error::from(RoutingError::UnknownSession("abc".into()));
        assert_eq!(err.kind(), "RoutingError");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
