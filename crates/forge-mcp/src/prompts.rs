//! MCP prompts
//!
//! Prompt templates are pure: no network, no shell, no side effects.

use crate::capabilities::{
    CapabilityContext, CapabilityDescriptor, CapabilityKind, Content, HandlerFuture,
};
use crate::schema::{Arguments, Field, FieldType, InputSchema};

const COMMIT_MESSAGE_FIELDS: &[Field] = &[
    Field::required("changes", FieldType::String, "Description or diff of the changes"),
    Field::optional("context", FieldType::String, "Additional context about the changes"),
];

/// Prompt capability descriptors.
pub fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![CapabilityDescriptor {
        name: "commit-message",
        kind: CapabilityKind::Prompt,
        description: "Ask the model to write a commit message for a set of changes",
        schema: InputSchema::new(COMMIT_MESSAGE_FIELDS),
        handler: commit_message,
    }]
}

/// Build the commit-message request sent to an external generator.
///
/// The "Additional context" section appears only when `context` is given.
pub fn commit_message_prompt(changes: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "Write a git commit message for the changes below.\n\
         Use the Conventional Commits format: type(scope): subject.\n\
         Keep the subject line under 72 characters and in the imperative mood.\n\
         Add a body only if the change needs explaining.\n\n\
         Changes:\n",
    );
    prompt.push_str(changes.trim_end());
    prompt.push('\n');

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nAdditional context:\n");
        prompt.push_str(context.trim_end());
        prompt.push('\n');
    }

    prompt
}

fn commit_message(_ctx: &CapabilityContext, args: Arguments) -> HandlerFuture<'_> {
    Box::pin(async move {
        let changes = args.require_str("changes")?;
        let context = args.get_str("context");
        Ok(vec![Content::text(commit_message_prompt(changes, context))])
    })
}
