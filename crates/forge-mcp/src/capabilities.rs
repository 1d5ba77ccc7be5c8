//! Capability registry
//!
//! The fixed set of named operations the server offers. Descriptors are
//! registered once at startup; the registry has no mutating API and is
//! shared read-only behind an `Arc`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use forge_host::SourceHost;
use forge_shell::ShellRunner;
use serde::Serialize;
use serde_json::Value;

use crate::schema::{Arguments, InputSchema};
use crate::{Error, Result, prompts, resources, tools};

/// What kind of MCP surface a capability is exposed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Resource,
    Tool,
    Prompt,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resource => "resource",
            Self::Tool => "tool",
            Self::Prompt => "prompt",
        })
    }
}

/// How a content item's text should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Json,
}

impl ContentKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Json => "application/json",
        }
    }
}

/// One item of a successful operation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub kind: ContentKind,
    pub text: String,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            text: text.into(),
        }
    }

    /// Pretty-printed JSON content.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            kind: ContentKind::Json,
            text: serde_json::to_string_pretty(value)?,
        })
    }
}

/// Collaborators available to every handler.
#[derive(Clone)]
pub struct CapabilityContext {
    pub host: Arc<dyn SourceHost>,
    pub shell: Arc<dyn ShellRunner>,
}

impl CapabilityContext {
    pub fn new(host: Arc<dyn SourceHost>, shell: Arc<dyn ShellRunner>) -> Self {
        Self { host, shell }
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Content>>> + Send + 'a>>;

/// Runs a capability with validated arguments.
pub type Handler = for<'a> fn(&'a CapabilityContext, Arguments) -> HandlerFuture<'a>;

/// A named operation with its declared input shape.
#[derive(Clone, Copy)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub kind: CapabilityKind,
    pub description: &'static str,
    pub schema: InputSchema,
    pub handler: Handler,
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A single invocation of a capability.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub kind: CapabilityKind,
    pub name: String,
    pub arguments: Value,
    /// Session the request arrived on, when routed over the SSE transport.
    pub session_id: Option<String>,
}

impl OperationRequest {
    pub fn new(kind: CapabilityKind, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            kind,
            name: name.into(),
            arguments,
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<&str>) -> Self {
        self.session_id = session_id.map(str::to_string);
        self
    }
}

/// Immutable set of capability descriptors.
#[derive(Debug)]
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
}

impl CapabilityRegistry {
    /// Build a registry from descriptors.
    ///
    /// A later descriptor with the same kind and name as an earlier one is
    /// ignored, with a warning.
    pub fn new(descriptors: impl IntoIterator<Item = CapabilityDescriptor>) -> Self {
        let mut unique: Vec<CapabilityDescriptor> = Vec::new();
        for descriptor in descriptors {
            if unique
                .iter()
                .any(|d| d.kind == descriptor.kind && d.name == descriptor.name)
            {
                tracing::warn!(
                    kind = %descriptor.kind,
                    name = descriptor.name,
                    "Ignoring duplicate capability"
                );
                continue;
            }
            unique.push(descriptor);
        }
        Self {
            descriptors: unique,
        }
    }

    /// Every resource, tool and prompt the server offers.
    pub fn standard() -> Self {
        Self::new(
            resources::descriptors()
                .into_iter()
                .chain(tools::descriptors())
                .chain(prompts::descriptors()),
        )
    }

    pub fn find(&self, kind: CapabilityKind, name: &str) -> Option<&CapabilityDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.kind == kind && d.name == name)
    }

    pub fn list(&self, kind: CapabilityKind) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.descriptors.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validate and run one request.
    ///
    /// Schema validation happens before the handler runs; no collaborator is
    /// touched for malformed arguments. Failures are logged here, once,
    /// before being returned.
    pub async fn invoke(
        &self,
        context: &CapabilityContext,
        request: OperationRequest,
    ) -> Result<Vec<Content>> {
        let session = request.session_id.as_deref().unwrap_or("-");

        let result = match self.find(request.kind, &request.name) {
            None => Err(Error::UnknownCapability {
                kind: request.kind,
                name: request.name.clone(),
            }),
            Some(descriptor) => match descriptor.schema.validate(&request.arguments) {
                Err(e) => Err(Error::Validation(e)),
                Ok(arguments) => {
                    tracing::debug!(
                        kind = %request.kind,
                        name = %request.name,
                        session,
                        "Invoking capability"
                    );
                    (descriptor.handler)(context, arguments).await
                }
            },
        };

        if let Err(e) = &result {
            tracing::warn!(
                kind = %request.kind,
                name = %request.name,
                session,
                error_kind = e.kind(),
                error = %e,
                "Capability failed"
            );
        }

        result
    }
}
