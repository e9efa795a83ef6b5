//! OpenAPI document types.
//!
//! Three documents are produced per run:
//!
//! - [`RouterDocument`]: one per route source file, `paths.<editedKey>.<method>`;
//! - [`MainDocument`]: `swagger.yaml`, whose paths are `$ref` pointers into router documents;
//! - [`SingleDocument`]: `single.yaml`, every operation and schema inlined.
//!
//! All maps are insertion-ordered so repeated runs serialize identically.

use crate::registry::COMPONENT_DIR;
use crate::schema::Schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// OpenAPI version written to the main and single documents
pub const OPENAPI_VERSION: &str = "3.1.0";

/// Name of the bearer token security scheme
pub const JWT_SCHEME: &str = "jwt";

/// Media type of every request and response body
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// OpenAPI SecurityScheme object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub scheme: String,
    #[serde(rename = "bearerFormat")]
    pub bearer_format: String,
}

impl SecurityScheme {
    /// `type: http, scheme: bearer, bearerFormat: JWT`
    pub fn jwt() -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: "bearer".to_string(),
            bearer_format: "JWT".to_string(),
        }
    }
}

/// Security requirement, e.g. `{ jwt: [] }`
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Schema,
}

impl Parameter {
    /// A required string path parameter
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Path,
            required: true,
            description: None,
            schema: Schema::of_type("string"),
        }
    }

    /// An optional string query parameter
    pub fn query(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Query,
            required: false,
            description,
            schema: Schema::of_type("string"),
        }
    }
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// `{ application/json: { schema } }`
fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
    content
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    /// A required JSON body
    pub fn json(schema: Schema) -> Self {
        Self {
            required: true,
            content: json_content(schema),
        }
    }
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

impl Response {
    /// A successful JSON response
    pub fn json(schema: Schema) -> Self {
        Self {
            description: "Successful response".to_string(),
            content: Some(json_content(schema)),
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path parameters first, then query parameters
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Status code -> response
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

impl Operation {
    /// Copy of this operation with registry locators rewritten to local pointers.
    pub fn localized(&self) -> Self {
        let mut operation = self.clone();
        if let Some(body) = operation.request_body.as_mut() {
            for media in body.content.values_mut() {
                localize_schema(&mut media.schema);
            }
        }
        for response in operation.responses.values_mut() {
            for media in response.content.iter_mut().flat_map(|c| c.values_mut()) {
                localize_schema(&mut media.schema);
            }
        }
        operation
    }
}

/// An operation as it ends up in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationEntry {
    /// Built from annotations
    Generated(Operation),
    /// Taken verbatim from the previous output (`@manual`)
    Manual(Value),
}

impl OperationEntry {
    /// Copy with every registry locator rewritten to a local pointer.
    pub fn localized(&self) -> Self {
        match self {
            OperationEntry::Generated(operation) => OperationEntry::Generated(operation.localized()),
            OperationEntry::Manual(value) => {
                let mut value = value.clone();
                localize_value(&mut value);
                OperationEntry::Manual(value)
            }
        }
    }
}

/// Method -> operation
pub type PathItem = IndexMap<String, OperationEntry>;

/// Per route file document: `{ paths: { <editedKey>: { <method>: operation } } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouterDocument {
    pub paths: IndexMap<String, PathItem>,
}

/// A `$ref` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub reference: String,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, Value>>,
}

impl Components {
    fn with_jwt(schemas: Option<IndexMap<String, Value>>) -> Self {
        let mut security_schemes = IndexMap::new();
        security_schemes.insert(JWT_SCHEME.to_string(), SecurityScheme::jwt());
        Self {
            security_schemes,
            schemas,
        }
    }
}

/// `swagger.yaml`: paths are pointers into router documents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainDocument {
    pub openapi: String,
    pub info: Info,
    pub components: Components,
    /// Path template -> pointer
    pub paths: IndexMap<String, Reference>,
}

impl MainDocument {
    pub fn new(info: Info) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info,
            components: Components::with_jwt(None),
            paths: IndexMap::new(),
        }
    }
}

/// `single.yaml`: self-contained document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleDocument {
    pub openapi: String,
    pub info: Info,
    pub components: Components,
    /// Path template -> method -> operation
    pub paths: IndexMap<String, PathItem>,
}

impl SingleDocument {
    pub fn new(info: Info) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info,
            components: Components::with_jwt(Some(IndexMap::new())),
            paths: IndexMap::new(),
        }
    }

    /// The inlined schemas
    pub fn schemas_mut(&mut self) -> &mut IndexMap<String, Value> {
        self.components.schemas.get_or_insert_with(IndexMap::new)
    }
}

/// `./component/user.yaml#/User-default` -> `#/components/schemas/User-default`
pub fn local_schema_ref(locator: &str) -> String {
    let title = locator.rsplit('/').next().unwrap_or(locator);
    format!("#/components/schemas/{}", title)
}

/// Whether `pointer` points into a fragment file.
fn is_registry_locator(pointer: &str) -> bool {
    pointer.starts_with(&format!("./{}/", COMPONENT_DIR))
}

fn localize_schema(schema: &mut Schema) {
    if let Some(reference) = schema.reference.as_mut() {
        if is_registry_locator(reference) {
            *reference = local_schema_ref(reference);
        }
    }
    if let Some(items) = schema.items.as_mut() {
        localize_schema(items);
    }
    for property in schema.properties.iter_mut().flat_map(|p| p.values_mut()) {
        localize_schema(property);
    }
}

/// Rewrites every `$ref` string pointing into a fragment file, at any depth.
pub fn localize_value(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                if key.as_str() == Some("$ref") {
                    if let Value::String(pointer) = &mut *child {
                        if is_registry_locator(pointer) {
                            *pointer = local_schema_ref(pointer);
                        }
                        continue;
                    }
                }
                localize_value(child);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(localize_value),
        Value::Tagged(tagged) => localize_value(&mut tagged.value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn operation_with_refs() -> Operation {
        let mut operation = Operation {
            request_body: Some(RequestBody::json(Schema::reference(
                "./component/user.yaml#/User-default",
            ))),
            ..Operation::default()
        };
        operation.responses.insert(
            "200".to_string(),
            Response::json(Schema::reference("./component/admin/order.yaml#/Order-default")),
        );
        operation
    }

    #[test]
    fn test_local_schema_ref() {
        assert_eq!(
            local_schema_ref("./component/admin/user.yaml#/User-default"),
            "#/components/schemas/User-default"
        );
    }

    #[test]
    fn test_operation_localized() {
        let localized = operation_with_refs().localized();

        let body = localized.request_body.as_ref().unwrap();
        assert_eq!(
            body.content[JSON_MEDIA_TYPE].schema.reference.as_deref(),
            Some("#/components/schemas/User-default")
        );
        let content = localized.responses["200"].content.as_ref().unwrap();
        let response = &content[JSON_MEDIA_TYPE].schema;
        assert_eq!(
            response.reference.as_deref(),
            Some("#/components/schemas/Order-default")
        );
    }

    #[test]
    fn test_dangling_pointer_untouched() {
        let operation = Operation {
            request_body: Some(RequestBody::json(Schema::reference("#/components/schemas/Ghost"))),
            ..Operation::default()
        };
        assert_eq!(operation.localized(), operation);
    }

    #[test]
    fn test_localize_manual_value() {
        let mut value: Value = serde_yaml::from_str(
            "responses:\n  '200':\n    content:\n      application/json:\n        schema:\n          $ref: ./component/user.yaml#/User-public\n",
        )
        .unwrap();
        localize_value(&mut value);

        let pointer = &value["responses"]["200"]["content"]["application/json"]["schema"]["$ref"];
        assert_eq!(pointer.as_str(), Some("#/components/schemas/User-public"));
    }

    #[test]
    fn test_main_document_layout() {
        let mut doc = MainDocument::new(Info {
            title: "Sample API".to_string(),
            version: "1.0.0".to_string(),
        });
        doc.paths.insert(
            "/users/{id}".to_string(),
            Reference {
                reference: "./router/users.yaml#/paths/users-{id}".to_string(),
            },
        );
        let value = serde_yaml::to_value(&doc).unwrap();

        assert_eq!(value["openapi"].as_str(), Some("3.1.0"));
        assert_eq!(value["components"]["securitySchemes"]["jwt"]["scheme"].as_str(), Some("bearer"));
        assert_eq!(
            value["components"]["securitySchemes"]["jwt"]["bearerFormat"].as_str(),
            Some("JWT")
        );
        assert!(value["components"].get("schemas").is_none());
        assert_eq!(
            value["paths"]["/users/{id}"]["$ref"].as_str(),
            Some("./router/users.yaml#/paths/users-{id}")
        );
    }

    #[test]
    fn test_operation_serialization() {
        let mut operation = Operation::default();
        operation.parameters.push(Parameter::path("id"));
        operation.parameters.push(Parameter::query("page", None));
        let mut jwt = SecurityRequirement::new();
        jwt.insert(JWT_SCHEME.to_string(), Vec::new());
        operation.security = Some(vec![jwt]);

        let value = serde_yaml::to_value(&OperationEntry::Generated(operation)).unwrap();
        assert_eq!(value["parameters"][0]["in"].as_str(), Some("path"));
        assert_eq!(value["parameters"][0]["required"].as_bool(), Some(true));
        assert_eq!(value["parameters"][1]["in"].as_str(), Some("query"));
        assert!(value["parameters"][1].get("description").is_none());
        assert!(value["security"][0]["jwt"].as_sequence().unwrap().is_empty());
        assert!(value["responses"].as_mapping().unwrap().is_empty());
    }
}
