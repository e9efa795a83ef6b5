//! Model introspection.
//!
//! The registry does not know how models are declared; it asks a [`ModelIntrospector`] for the
//! base schema of each model file. [`DescriptorIntrospector`] is the bundled implementation and
//! reads JSON or YAML model descriptors in a mongoose-like shape:
//!
//! ```yaml
//! name: User
//! fields:
//!   email: { type: String, required: true }
//!   age: Number
//!   roles: [String]
//!   address:
//!     street: String
//!     city: String
//!   createdAt: Date
//! ```
//!
//! A descriptor that already carries a `title` is taken as a finished schema fragment.

use crate::error::{Error, Result};
use crate::schema::Schema;
use indexmap::IndexMap;
use log::debug;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Turns one model source file into its base schema fragment.
///
/// The returned schema must carry a `title`; it names the fragment in the registry.
pub trait ModelIntrospector {
    /// Introspects the model declared in `path`.
    ///
    /// # Errors
    ///
    /// Any error means the model is skipped; it never aborts a run.
    fn introspect(&self, path: &Path) -> Result<Schema>;
}

/// Reads `.json`, `.yaml` and `.yml` model descriptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct DescriptorIntrospector;

impl ModelIntrospector for DescriptorIntrospector {
    fn introspect(&self, path: &Path) -> Result<Schema> {
        debug!("Introspecting model: {}", path.display());
        let fail = |message: String| Error::Introspection {
            file: path.to_path_buf(),
            message,
        };

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let content = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let descriptor: Value = match extension {
            "json" => serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| fail(e.to_string()))?,
            other => return Err(fail(format!("unsupported model file type `{}`", other))),
        };

        descriptor_to_schema(&descriptor).map_err(fail)
    }
}

/// Converts a parsed descriptor into a titled schema fragment.
pub fn descriptor_to_schema(descriptor: &Value) -> std::result::Result<Schema, String> {
    let map = descriptor
        .as_mapping()
        .ok_or_else(|| "descriptor is not a mapping".to_string())?;

    if map.contains_key("title") {
        let schema: Schema = serde_yaml::from_value(descriptor.clone()).map_err(|e| e.to_string())?;
        return match schema.title.as_deref() {
            Some(title) if !title.is_empty() => Ok(schema),
            _ => Err("empty `title`".to_string()),
        };
    }

    let name = map
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing model `name`".to_string())?;
    let fields = match map.get("fields") {
        Some(Value::Mapping(fields)) => fields.clone(),
        Some(_) => return Err("`fields` is not a mapping".to_string()),
        None => Mapping::new(),
    };

    let mut schema = object_schema(&fields)?;
    schema.title = Some(name.to_string());
    Ok(schema)
}

/// An object schema from a mapping of field name to field declaration.
fn object_schema(fields: &Mapping) -> std::result::Result<Schema, String> {
    let mut properties = IndexMap::new();
    let mut required = Vec::new();

    for (key, spec) in fields {
        let name = key
            .as_str()
            .ok_or_else(|| format!("field name {:?} is not a string", key))?;
        let (schema, is_required) =
            field_schema(spec).map_err(|e| format!("field `{}`: {}", name, e))?;
        if is_required {
            required.push(name.to_string());
        }
        properties.insert(name.to_string(), schema);
    }

    let mut schema = Schema::object(properties);
    if !required.is_empty() {
        schema.required = Some(required);
    }
    Ok(schema)
}

/// Schema of one field declaration, and whether it is required.
fn field_schema(spec: &Value) -> std::result::Result<(Schema, bool), String> {
    match spec {
        Value::String(type_name) => Ok((named_type(type_name)?, false)),
        Value::Sequence(items) => {
            let items = match items.first() {
                Some(first) => field_schema(first)?.0,
                None => Schema::default(),
            };
            Ok((Schema::array(items), false))
        }
        Value::Mapping(map) => match map.get("type") {
            Some(type_spec) => {
                let (mut schema, _) = field_schema(type_spec)?;
                let required = map.get("required").and_then(Value::as_bool).unwrap_or(false);
                if let Some(Value::Sequence(values)) = map.get("enum") {
                    schema.enum_values = Some(values.clone());
                }
                if let Some(description) = map.get("description").and_then(Value::as_str) {
                    schema.description = Some(description.to_string());
                }
                if let Some(default) = map.get("default") {
                    schema.default = Some(default.clone());
                }
                Ok((schema, required))
            }
            None => Ok((object_schema(map)?, false)),
        },
        other => Err(format!("unsupported field declaration {:?}", other)),
    }
}

/// Schema for a declared type name such as `String` or `ObjectId`.
fn named_type(type_name: &str) -> std::result::Result<Schema, String> {
    let name = type_name
        .trim()
        .trim_start_matches("Schema.Types.")
        .trim_start_matches("mongoose.");
    let schema = match name.to_ascii_lowercase().as_str() {
        "string" | "objectid" | "buffer" | "uuid" => Schema::of_type("string"),
        "number" | "decimal128" | "double" | "int32" | "bigint" => Schema::of_type("number"),
        "boolean" | "bool" => Schema::of_type("boolean"),
        "date" => Schema {
            format: Some("date-time".to_string()),
            ..Schema::of_type("string")
        },
        "mixed" | "map" | "object" => Schema::of_type("object"),
        "array" => Schema::array(Schema::default()),
        _ => return Err(format!("unknown type `{}`", type_name)),
    };
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn convert(yaml: &str) -> std::result::Result<Schema, String> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        descriptor_to_schema(&value)
    }

    #[test]
    fn test_mongoose_style_descriptor() {
        let schema = convert(
            r#"
name: User
fields:
  email: { type: String, required: true }
  age: Number
  roles: [String]
  address:
    street: String
  createdAt: Date
  status: { type: String, enum: [active, banned], default: active }
"#,
        )
        .unwrap();

        assert_eq!(schema.title.as_deref(), Some("User"));
        assert_eq!(schema.schema_type.as_deref(), Some("object"));
        assert_eq!(schema.required, Some(vec!["email".to_string()]));

        let properties = schema.properties.unwrap();
        assert_eq!(properties["email"], Schema::of_type("string"));
        assert_eq!(properties["age"], Schema::of_type("number"));
        assert_eq!(properties["roles"], Schema::array(Schema::of_type("string")));
        assert_eq!(properties["address"].schema_type.as_deref(), Some("object"));
        assert_eq!(properties["createdAt"].format.as_deref(), Some("date-time"));
        assert_eq!(properties["status"].enum_values.as_ref().unwrap().len(), 2);
        assert_eq!(
            properties["status"].default,
            Some(Value::String("active".to_string()))
        );
    }

    #[test]
    fn test_array_of_subdocuments() {
        let schema = convert("name: Cart\nfields:\n  lines: [{ sku: String, qty: Number }]\n").unwrap();
        let lines = &schema.properties.unwrap()["lines"];

        assert_eq!(lines.schema_type.as_deref(), Some("array"));
        let item = lines.items.as_ref().unwrap();
        assert_eq!(item.properties.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_titled_fragment_passes_through() {
        let schema = convert("title: Order\ntype: object\nproperties:\n  id: { type: string }\n").unwrap();
        assert_eq!(schema.title.as_deref(), Some("Order"));
        assert!(schema.properties.unwrap().contains_key("id"));
    }

    #[test]
    fn test_titled_fragment_keeps_every_keyword() {
        let schema = convert(
            "title: Account\ntype: object\nadditionalProperties: false\nproperties:\n  id: { type: string, nullable: true, minLength: 3 }\n  kind: { oneOf: [{ type: string }, { type: number }] }\n",
        )
        .unwrap();

        let value = serde_yaml::to_value(&schema).unwrap();
        assert_eq!(value["additionalProperties"], Value::Bool(false));
        assert_eq!(value["properties"]["id"]["nullable"], Value::Bool(true));
        assert_eq!(value["properties"]["id"]["minLength"].as_u64(), Some(3));
        assert_eq!(value["properties"]["kind"]["oneOf"][1]["type"].as_str(), Some("number"));
    }

    #[test]
    fn test_missing_name() {
        let err = convert("fields:\n  a: String\n").unwrap_err();
        assert!(err.contains("name"));
    }

    #[test]
    fn test_unknown_type() {
        let err = convert("name: A\nfields:\n  a: Quaternion\n").unwrap_err();
        assert!(err.contains("field `a`"));
        assert!(err.contains("Quaternion"));
    }

    #[test]
    fn test_introspect_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user.json");
        fs::write(&path, r#"{"name": "User", "fields": {"name": "String"}}"#).unwrap();

        let schema = DescriptorIntrospector.introspect(&path).unwrap();
        assert_eq!(schema.title.as_deref(), Some("User"));
    }

    #[test]
    fn test_introspect_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user.js");
        fs::write(&path, "module.exports = {}").unwrap();

        let err = DescriptorIntrospector.introspect(&path).unwrap_err();
        assert!(matches!(err, Error::Introspection { .. }));
        assert!(err.to_string().contains("unsupported model file type"));
    }
}
