//! The capability registry.
//!
//! Holds the immutable descriptors and their bound handlers, keyed by
//! `(kind, name)`. Registration happens once, single-threaded, at startup;
//! after that the registry is shared immutably (`Arc<Registry>`) and all
//! reads are pure, so no runtime locking is needed.
//!
//! Duplicate names within a kind and malformed schemas are configuration
//! errors detected here, at registration time — never at call time.

use crate::capability::{CapabilityKind, PromptDef, PromptMessage, ResourceDef, ToolDef};
use crate::error::CapError;
use indexmap::IndexMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// The future type all handlers return.
pub type HandlerFuture<T> = Pin<Box<dyn Future<Output = Result<T, CapError>> + Send>>;

/// A boxed tool handler: named arguments in, a JSON value out.
pub type BoxedToolFn =
    Box<dyn Fn(serde_json::Map<String, Value>) -> HandlerFuture<Value> + Send + Sync>;

/// A boxed resource handler: named arguments in, text content out.
pub type BoxedResourceFn =
    Box<dyn Fn(serde_json::Map<String, Value>) -> HandlerFuture<String> + Send + Sync>;

/// A boxed prompt handler: named arguments in, a conversation out.
pub type BoxedPromptFn =
    Box<dyn Fn(serde_json::Map<String, Value>) -> HandlerFuture<Vec<PromptMessage>> + Send + Sync>;

/// A registered tool with its descriptor and handler.
pub struct ToolEntry {
    /// The immutable descriptor.
    pub def: ToolDef,
    /// The bound handler.
    pub handler: BoxedToolFn,
}

/// A registered resource with its descriptor and handler.
pub struct ResourceEntry {
    /// The immutable descriptor.
    pub def: ResourceDef,
    /// The bound handler.
    pub handler: BoxedResourceFn,
}

/// A registered prompt with its descriptor and handler.
pub struct PromptEntry {
    /// The immutable descriptor.
    pub def: PromptDef,
    /// The bound handler.
    pub handler: BoxedPromptFn,
}

/// The capability registry.
///
/// Insertion order is preserved per kind so discovery listings are
/// deterministic.
#[derive(Default)]
pub struct Registry {
    tools: IndexMap<String, ToolEntry>,
    resources: IndexMap<String, ResourceEntry>,
    prompts: IndexMap<String, PromptEntry>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Fails with [`CapError::DuplicateCapability`] if a tool of this name
    /// exists, or [`CapError::InvalidSchema`] if the declared schema is
    /// malformed.
    pub fn register_tool<F, Fut>(&mut self, def: ToolDef, handler: F) -> Result<(), CapError>
    where
        F: Fn(serde_json::Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, CapError>> + Send + 'static,
    {
        Self::check_schema(CapabilityKind::Tool, &def.name, &def.input_schema)?;
        if self.tools.contains_key(&def.name) {
            return Err(CapError::DuplicateCapability {
                kind: CapabilityKind::Tool,
                name: def.name,
            });
        }
        let boxed: BoxedToolFn = Box::new(move |args| Box::pin(handler(args)));
        self.tools.insert(
            def.name.clone(),
            ToolEntry {
                def,
                handler: boxed,
            },
        );
        Ok(())
    }

    /// Register a resource.
    pub fn register_resource<F, Fut>(
        &mut self,
        def: ResourceDef,
        handler: F,
    ) -> Result<(), CapError>
    where
        F: Fn(serde_json::Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CapError>> + Send + 'static,
    {
        Self::check_schema(CapabilityKind::Resource, &def.name, &def.input_schema)?;
        if self.resources.contains_key(&def.name) {
            return Err(CapError::DuplicateCapability {
                kind: CapabilityKind::Resource,
                name: def.name,
            });
        }
        let boxed: BoxedResourceFn = Box::new(move |args| Box::pin(handler(args)));
        self.resources.insert(
            def.name.clone(),
            ResourceEntry {
                def,
                handler: boxed,
            },
        );
        Ok(())
    }

    /// Register a prompt.
    pub fn register_prompt<F, Fut>(&mut self, def: PromptDef, handler: F) -> Result<(), CapError>
    where
        F: Fn(serde_json::Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<PromptMessage>, CapError>> + Send + 'static,
    {
        Self::check_schema(CapabilityKind::Prompt, &def.name, &def.input_schema)?;
        if self.prompts.contains_key(&def.name) {
            return Err(CapError::DuplicateCapability {
                kind: CapabilityKind::Prompt,
                name: def.name,
            });
        }
        let boxed: BoxedPromptFn = Box::new(move |args| Box::pin(handler(args)));
        self.prompts.insert(
            def.name.clone(),
            PromptEntry {
                def,
                handler: boxed,
            },
        );
        Ok(())
    }

    fn check_schema(
        kind: CapabilityKind,
        name: &str,
        schema: &crate::schema::ArgumentSchema,
    ) -> Result<(), CapError> {
        schema.validate().map_err(|reason| CapError::InvalidSchema {
            kind,
            name: name.to_string(),
            reason,
        })
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// Look up a resource by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceEntry> {
        self.resources.get(name)
    }

    /// Look up a prompt by name.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&PromptEntry> {
        self.prompts.get(name)
    }

    /// Check whether a capability of this `(kind, name)` exists.
    #[must_use]
    pub fn contains(&self, kind: CapabilityKind, name: &str) -> bool {
        match kind {
            CapabilityKind::Tool => self.tools.contains_key(name),
            CapabilityKind::Resource => self.resources.contains_key(name),
            CapabilityKind::Prompt => self.prompts.contains_key(name),
        }
    }

    /// Number of capabilities registered under a kind.
    #[must_use]
    pub fn count(&self, kind: CapabilityKind) -> usize {
        match kind {
            CapabilityKind::Tool => self.tools.len(),
            CapabilityKind::Resource => self.resources.len(),
            CapabilityKind::Prompt => self.prompts.len(),
        }
    }

    /// Discovery summaries for a kind, in registration order.
    ///
    /// The iterator is restartable: each call walks the registry afresh.
    pub fn summaries(&self, kind: CapabilityKind) -> impl Iterator<Item = Value> + '_ {
        let items: Vec<Value> = match kind {
            CapabilityKind::Tool => self.tools.values().map(|e| e.def.summary()).collect(),
            CapabilityKind::Resource => self.resources.values().map(|e| e.def.summary()).collect(),
            CapabilityKind::Prompt => self.prompts.values().map(|e| e.def.summary()).collect(),
        };
        items.into_iter()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .finish()
    }
}
