//! Argument schemas for capability inputs.
//!
//! Every capability declares the shape of the arguments it accepts: a flat
//! object of named, typed properties with a required subset. Schemas are
//! checked twice — for well-formedness when a capability is registered, and
//! against the actual arguments on every dispatch.
//!
//! # Example
//!
//! ```rust
//! use capkit_core::schema::{ArgumentSchema, PropertyType};
//!
//! let schema = ArgumentSchema::new()
//!     .require("a", PropertyType::Integer)
//!     .require("b", PropertyType::Integer)
//!     .property("precision", PropertyType::String);
//!
//! let args = serde_json::json!({"a": 2, "b": 3});
//! assert!(schema.check(args.as_object().unwrap()).is_ok());
//! ```

use indexmap::IndexMap;
use serde_json::Value;

/// The type of a single schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// A string value.
    String,
    /// A numeric value (integer or float).
    Number,
    /// An integer value.
    Integer,
    /// A boolean value.
    Boolean,
    /// An array value.
    Array,
    /// An object value.
    Object,
}

impl PropertyType {
    /// Check whether a JSON value matches this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Why a set of arguments was rejected.
///
/// Carries the FIRST failing field, in schema declaration order, so error
/// messages are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentViolation {
    /// A required field was absent.
    Missing {
        /// The missing field name.
        field: String,
    },
    /// A field was present but had the wrong type.
    WrongType {
        /// The offending field name.
        field: String,
        /// The type the schema declares.
        expected: PropertyType,
    },
}

impl ArgumentViolation {
    /// The name of the field that failed validation.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field } | Self::WrongType { field, .. } => field,
        }
    }
}

impl std::fmt::Display for ArgumentViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "missing required argument '{field}'"),
            Self::WrongType { field, expected } => {
                write!(f, "argument '{field}' must be of type {expected}")
            }
        }
    }
}

/// The declared argument shape of a capability.
///
/// Properties keep declaration order, which makes both discovery output and
/// validation error selection deterministic.
#[derive(Debug, Clone, Default)]
pub struct ArgumentSchema {
    properties: IndexMap<String, PropertyType>,
    required: Vec<String>,
}

impl ArgumentSchema {
    /// Create an empty schema accepting no declared properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.properties.insert(name.into(), ty);
        self
    }

    /// Declare a required property.
    #[must_use]
    pub fn require(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), ty);
        self.required.push(name);
        self
    }

    /// Mark a set of names as required.
    ///
    /// The names must refer to declared properties; [`validate`](Self::validate)
    /// rejects the schema otherwise.
    #[must_use]
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Check well-formedness of the schema itself.
    ///
    /// A schema is malformed when a required name has no declared property,
    /// or when the same name is required twice. Returns a human-readable
    /// reason on failure; callers surface it as a configuration error.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = Vec::with_capacity(self.required.len());
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(format!("required field '{name}' has no declared property"));
            }
            if seen.contains(&name) {
                return Err(format!("field '{name}' is required more than once"));
            }
            seen.push(name);
        }
        Ok(())
    }

    /// Validate a set of arguments against the schema.
    ///
    /// Required fields are checked first (in declaration order), then the
    /// types of every provided, declared field. Undeclared extras are
    /// ignored. The error names the first failing field.
    pub fn check(
        &self,
        arguments: &serde_json::Map<String, Value>,
    ) -> Result<(), ArgumentViolation> {
        for name in &self.required {
            if !arguments.contains_key(name) {
                return Err(ArgumentViolation::Missing { field: name.clone() });
            }
        }
        for (name, ty) in &self.properties {
            if let Some(value) = arguments.get(name) {
                if !ty.matches(value) {
                    return Err(ArgumentViolation::WrongType {
                        field: name.clone(),
                        expected: *ty,
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether the schema declares any properties at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render the schema as JSON-Schema-shaped JSON for discovery output.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, ty)| (name.clone(), serde_json::json!({ "type": ty })))
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}
