//! Inline object literals used by `@body` and `@response`.
//!
//! Instead of naming a registered model, an annotation may describe the payload inline with an
//! unquoted shorthand such as `{name: string, tags: [string], owner: {id: string}}`. Every
//! bareword is quoted and the result is read as JSON, then the value tree is turned into an
//! object schema.
//!
//! Because every bareword is quoted, `true` or `42` inside a literal become strings too, so
//! `{age: number}` describes `age` as `type: string`.

use crate::error::{Error, Result};
use crate::schema::Schema;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Converts a shorthand literal into an `object` schema.
///
/// # Errors
///
/// Returns [`Error::ShorthandLiteral`] if the quoted text is not valid JSON or its top level
/// is not an object.
pub fn to_body_schema(literal: &str) -> Result<Schema> {
    match parse_literal(literal)? {
        Value::Object(map) => Ok(Schema::object(to_properties(&map))),
        other => Err(Error::ShorthandLiteral {
            literal: literal.to_string(),
            message: format!("expected an object, found {}", type_name(&other)),
        }),
    }
}

/// Quotes every bareword of `literal` and parses the result.
pub fn parse_literal(literal: &str) -> Result<Value> {
    let quoted = quote_barewords(literal);
    serde_json::from_str(&quoted).map_err(|e| Error::ShorthandLiteral {
        literal: literal.to_string(),
        message: e.to_string(),
    })
}

/// Wraps each run of word characters outside a string literal in double quotes.
fn quote_barewords(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut in_word = false;

    for c in literal.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && !in_word {
            out.push('"');
            in_word = true;
        } else if !is_word && in_word {
            out.push('"');
            in_word = false;
        }
        if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    if in_word {
        out.push('"');
    }
    out
}

/// Converts every entry of an object into a property schema.
pub fn to_properties(map: &Map<String, Value>) -> IndexMap<String, Schema> {
    map.iter()
        .map(|(key, value)| (key.clone(), to_schema(value)))
        .collect()
}

/// Converts a parsed value into a schema.
///
/// Arrays are typed by their first element only.
pub fn to_schema(value: &Value) -> Schema {
    match value {
        Value::Array(items) => match items.first() {
            None => Schema::array(Schema::default()),
            Some(Value::Object(map)) => Schema::array(Schema::object(to_properties(map))),
            Some(first) => Schema::array(to_schema(first)),
        },
        Value::Object(map) => Schema::object(to_properties(map)),
        scalar => Schema::of_type(type_name(scalar)),
    }
}

/// Runtime type name of a parsed value, as a JavaScript `typeof` would report it.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}
