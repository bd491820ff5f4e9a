//! Capability descriptors and their result shapes.
//!
//! A capability is a named, typed operation a client may invoke: a **tool**
//! (returns a value), a **resource** (returns typed text content), or a
//! **prompt** (returns an ordered conversation of role-tagged messages).
//! Descriptors are immutable once registered; the registry owns them.

use crate::schema::ArgumentSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three capability namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// A callable operation returning a value.
    Tool,
    /// A retrievable content item with a declared mime type.
    Resource,
    /// A message template producing a conversation.
    Prompt,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Resource => write!(f, "resource"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// The speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The assistant side of the conversation.
    Assistant,
}

/// One message in a prompt result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Who speaks this message.
    pub role: Role,
    /// The message text.
    pub text: String,
}

impl PromptMessage {
    /// Create a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A resource read result: text content with its declared mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContent {
    /// The mime type declared at registration.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// The content itself.
    pub text: String,
}

/// Descriptor for a tool capability.
#[derive(Debug, Clone)]
pub struct ToolDef {
    /// Unique name within the tool namespace.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Declared argument shape.
    pub input_schema: ArgumentSchema,
}

impl ToolDef {
    /// Create a tool descriptor with an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: ArgumentSchema::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: ArgumentSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Render the discovery summary for this tool.
    #[must_use]
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema.to_json(),
        })
    }
}

/// Descriptor for a resource capability.
#[derive(Debug, Clone)]
pub struct ResourceDef {
    /// Unique name within the resource namespace.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Mime type of the content this resource yields.
    pub mime_type: String,
    /// Declared argument shape (empty for static resources).
    pub input_schema: ArgumentSchema,
}

impl ResourceDef {
    /// Create a resource descriptor with `text/plain` content.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            mime_type: "text/plain".to_string(),
            input_schema: ArgumentSchema::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the mime type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Set the input schema (for parameterized resources).
    #[must_use]
    pub fn input_schema(mut self, schema: ArgumentSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Render the discovery summary for this resource.
    #[must_use]
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "mimeType": self.mime_type,
        })
    }
}

/// Descriptor for a prompt capability.
#[derive(Debug, Clone)]
pub struct PromptDef {
    /// Unique name within the prompt namespace.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Declared argument shape.
    pub input_schema: ArgumentSchema,
}

impl PromptDef {
    /// Create a prompt descriptor with an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: ArgumentSchema::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: ArgumentSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Render the discovery summary for this prompt.
    #[must_use]
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema.to_json(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyType;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CapabilityKind::Tool).unwrap(),
            r#""tool""#
        );
        let kind: CapabilityKind = serde_json::from_str(r#""prompt""#).unwrap();
        assert_eq!(kind, CapabilityKind::Prompt);
    }

    #[test]
    fn prompt_message_shape() {
        let msg = PromptMessage::assistant("I'll help debug that.");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["text"], "I'll help debug that.");
    }

    #[test]
    fn resource_content_uses_camel_case_mime_key() {
        let content = ResourceContent {
            mime_type: "text/plain".to_string(),
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["mimeType"], "text/plain");
    }

    #[test]
    fn tool_summary_includes_schema() {
        let def = ToolDef::new("add")
            .description("Add two integers")
            .input_schema(
                ArgumentSchema::new()
                    .require("a", PropertyType::Integer)
                    .require("b", PropertyType::Integer),
            );
        let summary = def.summary();
        assert_eq!(summary["name"], "add");
        assert_eq!(summary["inputSchema"]["required"], serde_json::json!(["a", "b"]));
    }
}
