use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// OpenAPI Schema definition
///
/// Shared by every producer of schemas: inline object literals from `@body`/`@response`,
/// model descriptors and the `$ref` pointers resolved through the registry. Properties keep
/// their declaration order so that output is stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema title (set on model fragments)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The type of the schema (string, number, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g. "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_yaml::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Every other keyword (`additionalProperties`, `nullable`, `x-*`, ...), kept as written
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Schema {
    /// A schema that only carries a `type`
    pub fn of_type(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// An `object` schema with the given properties
    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            ..Self::default()
        }
    }

    /// An `array` schema with the given item schema
    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// A bare `$ref` schema
    pub fn reference(pointer: impl Into<String>) -> Self {
        Self {
            reference: Some(pointer.into()),
            ..Self::default()
        }
    }
}
