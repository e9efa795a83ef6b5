use crate::openapi::{Info, MainDocument, Reference, SingleDocument};
use crate::registry::SchemaRegistry;
use crate::routes::{RouteFile, ROUTER_DIR};
use crate::serializer::write_yaml;
use anyhow::Result;
use log::{debug, info};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// File name of the multi-file entry document
pub const MAIN_DOCUMENT: &str = "swagger.yaml";

/// File name of the self-contained document
pub const SINGLE_DOCUMENT: &str = "single.yaml";

/// Builds the main and single documents and writes every document into the staging tree.
///
/// Router documents are written as soon as their route file is added; [`DocumentAssembler::finish`]
/// writes the two aggregate documents.
pub struct DocumentAssembler {
    staging_dir: PathBuf,
    main: MainDocument,
    single: SingleDocument,
    route_files: usize,
    endpoints: usize,
}

impl DocumentAssembler {
    pub fn new(info: Info, staging_dir: &Path) -> Self {
        Self {
            staging_dir: staging_dir.to_path_buf(),
            main: MainDocument::new(info.clone()),
            single: SingleDocument::new(info),
            route_files: 0,
            endpoints: 0,
        }
    }

    /// Writes the router document of `file` and records its endpoints.
    pub fn add_route_file(&mut self, file: &RouteFile) -> Result<()> {
        let path = self.staging_dir.join(ROUTER_DIR).join(&file.relative);
        write_yaml(&file.document(), &path)?;

        for endpoint in &file.endpoints {
            self.main.paths.insert(
                endpoint.template.clone(),
                Reference {
                    reference: file.pointer(&endpoint.edited_key),
                },
            );
            self.single
                .paths
                .entry(endpoint.template.clone())
                .or_default()
                .insert(endpoint.method.clone(), endpoint.entry.localized());
        }

        debug!(
            "Added {} endpoints from {}",
            file.endpoints.len(),
            file.source.display()
        );
        self.route_files += 1;
        self.endpoints += file.endpoints.len();
        Ok(())
    }

    /// Inlines the registry schemas, then any schema of the previous `single.yaml` not
    /// produced by this run.
    pub fn add_schemas(&mut self, registry: &SchemaRegistry, previous_single: Option<&Value>) {
        let schemas = self.single.schemas_mut();
        for (title, schema) in registry.schemas() {
            let mut schema = schema.clone();
            crate::openapi::localize_value(&mut schema);
            schemas.insert(title.clone(), schema);
        }

        let previous = previous_single
            .and_then(|doc| doc.get("components"))
            .and_then(|components| components.get("schemas"))
            .and_then(Value::as_mapping);
        let mut kept = 0;
        for (key, schema) in previous.into_iter().flatten() {
            if let Some(title) = key.as_str() {
                if !schemas.contains_key(title) {
                    schemas.insert(title.to_string(), schema.clone());
                    kept += 1;
                }
            }
        }
        if kept > 0 {
            debug!("Kept {} schemas from the previous single document", kept);
        }
    }

    pub fn main(&self) -> &MainDocument {
        &self.main
    }

    pub fn single(&self) -> &SingleDocument {
        &self.single
    }

    /// Writes `swagger.yaml` and `single.yaml`.
    pub fn finish(self) -> Result<AssemblySummary> {
        write_yaml(&self.main, &self.staging_dir.join(MAIN_DOCUMENT))?;
        write_yaml(&self.single, &self.staging_dir.join(SINGLE_DOCUMENT))?;

        let summary = AssemblySummary {
            route_files: self.route_files,
            endpoints: self.endpoints,
            paths: self.main.paths.len(),
            schemas: self.single.components.schemas.as_ref().map_or(0, |s| s.len()),
        };
        info!(
            "Assembled {} paths from {} route files",
            summary.paths, summary.route_files
        );
        Ok(summary)
    }
}

/// Counts of what went into the documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblySummary {
    pub route_files: usize,
    pub endpoints: usize,
    pub paths: usize,
    pub schemas: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{Operation, OperationEntry, RequestBody};
    use crate::routes::Endpoint;
    use crate::schema::Schema;
    use crate::serializer::read_yaml;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn info() -> Info {
        Info {
            title: "Sample API".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    fn endpoint(template: &str, key: &str, method: &str, body: Option<&str>) -> Endpoint {
        Endpoint {
            template: template.to_string(),
            edited_key: key.to_string(),
            method: method.to_string(),
            entry: OperationEntry::Generated(Operation {
                request_body: body.map(|r| RequestBody::json(Schema::reference(r))),
                ..Operation::default()
            }),
        }
    }

    fn route_file(relative: &str, endpoints: Vec<Endpoint>) -> RouteFile {
        RouteFile {
            source: PathBuf::from(relative).with_extension("js"),
            relative: PathBuf::from(relative),
            endpoints,
        }
    }

    #[test]
    fn test_documents_written_with_pointers() {
        let dir = TempDir::new().unwrap();
        let mut assembler = DocumentAssembler::new(info(), dir.path());
        assembler
            .add_route_file(&route_file(
                "admin/users.yaml",
                vec![endpoint(
                    "/users/{id}",
                    "users-{id}",
                    "post",
                    Some("./component/user.yaml#/User-default"),
                )],
            ))
            .unwrap();
        let summary = assembler.finish().unwrap();

        assert_eq!(summary.paths, 1);
        let main: Value = read_yaml(&dir.path().join(MAIN_DOCUMENT)).unwrap();
        assert_eq!(
            main["paths"]["/users/{id}"]["$ref"].as_str(),
            Some("./router/admin/users.yaml#/paths/users-{id}")
        );

        let router: Value = read_yaml(&dir.path().join("router/admin/users.yaml")).unwrap();
        let schema = &router["paths"]["users-{id}"]["post"]["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["$ref"].as_str(), Some("./component/user.yaml#/User-default"));

        let single: Value = read_yaml(&dir.path().join(SINGLE_DOCUMENT)).unwrap();
        let schema = &single["paths"]["/users/{id}"]["post"]["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["$ref"].as_str(), Some("#/components/schemas/User-default"));
    }

    #[test]
    fn test_single_merges_methods_across_files() {
        let dir = TempDir::new().unwrap();
        let mut assembler = DocumentAssembler::new(info(), dir.path());
        assembler
            .add_route_file(&route_file("a.yaml", vec![endpoint("/items", "items", "get", None)]))
            .unwrap();
        assembler
            .add_route_file(&route_file("b.yaml", vec![endpoint("/items", "items", "post", None)]))
            .unwrap();

        let methods: Vec<_> = assembler.single().paths["/items"].keys().cloned().collect();
        assert_eq!(methods, vec!["get", "post"]);
        assert_eq!(
            assembler.main().paths["/items"].reference,
            "./router/b.yaml#/paths/items"
        );
    }

    #[test]
    fn test_schemas_current_run_wins() {
        let dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();
        registry.insert(
            "User-default",
            "./component/user.yaml#/User-default",
            serde_yaml::from_str("type: object\n").unwrap(),
        );
        let previous: Value = serde_yaml::from_str(
            "components:\n  schemas:\n    User-default:\n      type: string\n    Legacy:\n      type: object\n",
        )
        .unwrap();

        let mut assembler = DocumentAssembler::new(info(), dir.path());
        assembler.add_schemas(&registry, Some(&previous));

        let schemas = assembler.single().components.schemas.as_ref().unwrap();
        let titles: Vec<_> = schemas.keys().cloned().collect();
        assert_eq!(titles, vec!["User-default", "Legacy"]);
        assert_eq!(schemas["User-default"]["type"].as_str(), Some("object"));
    }
}
