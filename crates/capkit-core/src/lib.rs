//! # capkit-core
//!
//! Core types for the capkit capability-protocol SDK.
//!
//! This crate provides the foundational building blocks shared by every
//! transport binding:
//!
//! - **Wire types**: request/response/cancel/terminate frames with a
//!   payload shape that is identical across stdio, SSE, and streamable HTTP
//! - **Capability descriptors**: tools, resources, and prompts with their
//!   argument schemas and result shapes
//! - **Registry**: `(kind, name)` → descriptor + handler, insertion-ordered,
//!   with duplicate and malformed-schema detection at registration time
//! - **Error handling**: a unified `CapError` type with rich diagnostics
//!
//! This crate is runtime-agnostic and does not depend on any async runtime.
//!
//! # Example
//!
//! ```rust
//! use capkit_core::capability::ToolDef;
//! use capkit_core::registry::Registry;
//! use capkit_core::schema::{ArgumentSchema, PropertyType};
//!
//! let mut registry = Registry::new();
//! registry.register_tool(
//!     ToolDef::new("add")
//!         .description("Add two integers")
//!         .input_schema(
//!             ArgumentSchema::new()
//!                 .require("a", PropertyType::Integer)
//!                 .require("b", PropertyType::Integer),
//!         ),
//!     |args| async move {
//!         let a = args.get("a").and_then(serde_json::Value::as_i64).unwrap_or_default();
//!         let b = args.get("b").and_then(serde_json::Value::as_i64).unwrap_or_default();
//!         Ok(serde_json::Value::from(a + b))
//!     },
//! ).unwrap();
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod schema;

// Re-export commonly used types at the crate root
pub use capability::{
    CapabilityKind, PromptDef, PromptMessage, ResourceContent, ResourceDef, Role, ToolDef,
};
pub use error::CapError;
pub use protocol::{
    CancelFrame, ClientMessage, ErrorKind, Request, RequestId, Response, ResponseError,
    TerminateFrame,
};
pub use registry::Registry;
pub use schema::{ArgumentSchema, ArgumentViolation, PropertyType};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use capkit_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capability::{
        CapabilityKind, PromptDef, PromptMessage, ResourceContent, ResourceDef, Role, ToolDef,
    };
    pub use crate::error::CapError;
    pub use crate::protocol::{
        ClientMessage, ErrorKind, Request, RequestId, Response, ResponseError,
    };
    pub use crate::registry::Registry;
    pub use crate::schema::{ArgumentSchema, PropertyType};
}

#[cfg(test)]
mod tests {
    #[test]
    fn prelude_imports() {
        use crate::prelude::*;

        let _tool = ToolDef::new("test");
        let _schema = ArgumentSchema::new().require("a", PropertyType::String);
        let _registry = Registry::new();
    }
}
