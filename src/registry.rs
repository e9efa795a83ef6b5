//! Schema registry: model fragments on disk and the name → location map built from them.
//!
//! Every model file gets a fragment file under `component/` mirroring its relative path. The
//! generated schema is stored under `<title>-default`; other keys already present in that
//! file (hand-written variants such as `User-public`) are preserved. After all models have been
//! processed the whole `component/` directory is read back, so fragments whose model was not
//! part of this run still resolve.

use crate::diagnostics::Diagnostics;
use crate::model::ModelIntrospector;
use crate::scanner::{pointer_path, relative_document_path, FileScanner};
use crate::serializer::{read_yaml, read_yaml_opt, write_yaml};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Suffix of the generated variant of every model schema.
pub const DEFAULT_VARIANT: &str = "default";

/// Directory holding fragment files, relative to the output root.
pub const COMPONENT_DIR: &str = "component";

/// Where a named schema fragment lives.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    /// Cross-file pointer, e.g. `./component/user.yaml#/User-default`
    pub locator: String,
    /// The fragment itself
    pub schema: Value,
}

/// Ordered map from schema title to its location.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fragment. A later registration of the same title replaces the earlier one.
    pub fn insert(&mut self, title: impl Into<String>, locator: impl Into<String>, schema: Value) {
        self.entries.insert(
            title.into(),
            RegistryEntry {
                locator: locator.into(),
                schema,
            },
        );
    }

    /// Looks up a symbolic name: the exact title first, then its default variant.
    pub fn resolve(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&variant_title(name, DEFAULT_VARIANT)))
    }

    /// Title and fragment of every entry, in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(title, entry)| (title, &entry.schema))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads every fragment file below `component_dir`.
    ///
    /// # Errors
    ///
    /// Fails if a fragment file cannot be read or is not a YAML mapping.
    pub fn load(component_dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        if !component_dir.is_dir() {
            return Ok(registry);
        }
        let scan = FileScanner::new(component_dir.to_path_buf()).scan()?;

        for file in scan.files {
            if file.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let fragments: Mapping = read_yaml(&file)
                .with_context(|| format!("Invalid schema fragment file: {}", file.display()))?;
            let relative = pointer_path(file.strip_prefix(component_dir).unwrap_or(&file));

            for (key, schema) in fragments {
                let Some(title) = key.as_str() else {
                    debug!("Skipping non-string key {:?} in {}", key, file.display());
                    continue;
                };
                registry.insert(title, locator(&relative, title), schema);
            }
        }

        debug!("Registry holds {} schemas", registry.len());
        Ok(registry)
    }
}

/// `<name>-<variant>`
pub fn variant_title(name: &str, variant: &str) -> String {
    format!("{}-{}", name, variant)
}

/// Pointer to `title` inside the fragment file at `relative` (below `component/`).
pub fn locator(relative: &str, title: &str) -> String {
    format!("./{}/{}#/{}", COMPONENT_DIR, relative, title)
}

/// What happened to one model file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// A fragment was written
    Produced { title: String, fragment_file: PathBuf },
    /// Introspection failed; no fragment for this model
    Skipped { reason: String },
}

/// Writes model fragments into the staging tree and builds the registry.
pub struct RegistryBuilder<'a> {
    introspector: &'a dyn ModelIntrospector,
    model_dir: PathBuf,
    component_dir: PathBuf,
}

impl<'a> RegistryBuilder<'a> {
    /// `component_dir` is the staging `component/` directory.
    pub fn new(introspector: &'a dyn ModelIntrospector, model_dir: &Path, component_dir: &Path) -> Self {
        Self {
            introspector,
            model_dir: model_dir.to_path_buf(),
            component_dir: component_dir.to_path_buf(),
        }
    }

    /// Introspects one model and merges its default variant into its fragment file.
    ///
    /// # Errors
    ///
    /// Only filesystem and codec failures on the fragment file are errors; a model that
    /// cannot be introspected is [`ModelOutcome::Skipped`].
    pub fn process_model(&self, model_file: &Path) -> Result<ModelOutcome> {
        let schema = match self.introspector.introspect(model_file) {
            Ok(schema) => schema,
            Err(e) => {
                return Ok(ModelOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
        };
        let Some(name) = schema.title.clone().filter(|t| !t.is_empty()) else {
            return Ok(ModelOutcome::Skipped {
                reason: "schema has no title".to_string(),
            });
        };

        let fragment_file = self
            .component_dir
            .join(relative_document_path(&self.model_dir, model_file));
        let mut fragments: Mapping = read_yaml_opt(&fragment_file)?.unwrap_or_default();

        let title = variant_title(&name, DEFAULT_VARIANT);
        let value = serde_yaml::to_value(&schema).context("Failed to convert schema fragment")?;
        fragments.insert(Value::String(title.clone()), value);
        write_yaml(&fragments, &fragment_file)?;

        debug!("Wrote {} to {}", title, fragment_file.display());
        Ok(ModelOutcome::Produced {
            title,
            fragment_file,
        })
    }

    /// Processes every model file, then loads the full registry from `component/`.
    pub fn build(&self, model_files: &[PathBuf], diagnostics: &mut Diagnostics) -> Result<SchemaRegistry> {
        let mut produced = 0;
        for model_file in model_files {
            match self.process_model(model_file)? {
                ModelOutcome::Produced { .. } => produced += 1,
                ModelOutcome::Skipped { reason } => {
                    diagnostics.warning(model_file, format!("model skipped: {}", reason));
                }
            }
        }
        info!("Generated {} of {} model schemas", produced, model_files.len());

        SchemaRegistry::load(&self.component_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DescriptorIntrospector;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    struct Layout {
        _dir: TempDir,
        models: PathBuf,
        component: PathBuf,
    }

    fn layout() -> Layout {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("models");
        let component = dir.path().join("swagger2").join(COMPONENT_DIR);
        fs::create_dir_all(&models).unwrap();
        Layout {
            _dir: dir,
            models,
            component,
        }
    }

    fn write_model(layout: &Layout, name: &str, content: &str) -> PathBuf {
        let path = layout.models.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_resolve_prefers_exact_title() {
        let mut registry = SchemaRegistry::new();
        registry.insert("User-default", "./component/user.yaml#/User-default", Value::Null);
        registry.insert("User-public", "./component/user.yaml#/User-public", Value::Null);

        assert_eq!(
            registry.resolve("User").unwrap().locator,
            "./component/user.yaml#/User-default"
        );
        assert_eq!(
            registry.resolve("User-public").unwrap().locator,
            "./component/user.yaml#/User-public"
        );
        assert!(registry.resolve("Order").is_none());
    }

    #[test]
    fn test_build_writes_fragment_and_locator() {
        let layout = layout();
        let user = write_model(&layout, "admin/user.json", r#"{"name": "User", "fields": {"email": "String"}}"#);

        let builder = RegistryBuilder::new(&DescriptorIntrospector, &layout.models, &layout.component);
        let mut diagnostics = Diagnostics::new();
        let registry = builder.build(&[user], &mut diagnostics).unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(
            registry.resolve("User").unwrap().locator,
            "./component/admin/user.yaml#/User-default"
        );
        assert!(layout.component.join("admin/user.yaml").exists());
    }

    #[test]
    fn test_merge_preserves_other_variants() {
        let layout = layout();
        fs::create_dir_all(&layout.component).unwrap();
        fs::write(
            layout.component.join("user.yaml"),
            "User-public:\n  type: object\nUser-default:\n  type: string\n",
        )
        .unwrap();
        let user = write_model(&layout, "user.yaml", "name: User\nfields:\n  email: String\n");

        let builder = RegistryBuilder::new(&DescriptorIntrospector, &layout.models, &layout.component);
        let registry = builder.build(&[user], &mut Diagnostics::new()).unwrap();

        let fragments: Mapping = read_yaml(&layout.component.join("user.yaml")).unwrap();
        assert!(fragments.contains_key("User-public"));
        assert_eq!(
            fragments.get("User-default").unwrap().get("type").unwrap(),
            &Value::String("object".to_string())
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_fragment_file_keeps_extra_keywords() {
        let layout = layout();
        let account = write_model(
            &layout,
            "account.yaml",
            "title: Account\ntype: object\nadditionalProperties: false\nx-owner: billing\n",
        );

        let builder = RegistryBuilder::new(&DescriptorIntrospector, &layout.models, &layout.component);
        let registry = builder.build(&[account], &mut Diagnostics::new()).unwrap();

        let fragments: Mapping = read_yaml(&layout.component.join("account.yaml")).unwrap();
        let fragment = fragments.get("Account-default").unwrap();
        assert_eq!(fragment.get("additionalProperties"), Some(&Value::Bool(false)));
        assert_eq!(fragment.get("x-owner").and_then(Value::as_str), Some("billing"));
        assert_eq!(registry.resolve("Account").unwrap().schema, fragment.clone());
    }

    #[test]
    fn test_failed_model_is_skipped() {
        let layout = layout();
        let broken = write_model(&layout, "broken.js", "export default {}");
        let good = write_model(&layout, "order.json", r#"{"name": "Order", "fields": {}}"#);

        let builder = RegistryBuilder::new(&DescriptorIntrospector, &layout.models, &layout.component);
        let outcome = builder.process_model(&broken).unwrap();
        assert!(matches!(outcome, ModelOutcome::Skipped { .. }));

        let mut diagnostics = Diagnostics::new();
        let registry = builder.build(&[broken, good], &mut diagnostics).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(registry.resolve("Order").is_some());
    }

    #[test]
    fn test_load_includes_untouched_fragments() {
        let layout = layout();
        fs::create_dir_all(&layout.component).unwrap();
        fs::write(
            layout.component.join("legacy.yaml"),
            "Legacy-default:\n  type: object\n",
        )
        .unwrap();

        let builder = RegistryBuilder::new(&DescriptorIntrospector, &layout.models, &layout.component);
        let registry = builder.build(&[], &mut Diagnostics::new()).unwrap();

        assert_eq!(
            registry.resolve("Legacy").unwrap().locator,
            "./component/legacy.yaml#/Legacy-default"
        );
    }

    #[test]
    fn test_load_rejects_invalid_fragment_file() {
        let layout = layout();
        fs::create_dir_all(&layout.component).unwrap();
        fs::write(layout.component.join("bad.yaml"), "- not\n- a mapping\n").unwrap();

        assert!(SchemaRegistry::load(&layout.component).is_err());
    }
}
