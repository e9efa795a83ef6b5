//! Run configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, a JSON config file
//! (`swaggerconfig.json` in the working directory, or the file named by `--config`), and
//! command-line flags.

use crate::error::Error;
use crate::openapi::Info;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "swaggerconfig.json";

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Route registration files
    pub router_dir: PathBuf,
    /// Model files
    pub model_dir: PathBuf,
    /// Published output tree
    pub output_dir: PathBuf,
    /// Identifier whose method calls register routes
    pub router_object: String,
    pub title: String,
    pub version: String,
    /// Abort before publishing on any diagnostic
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            router_dir: PathBuf::from("src/router"),
            model_dir: PathBuf::from("dist/src/model"),
            output_dir: PathBuf::from("swagger"),
            router_object: "router".to_string(),
            title: "Sample API".to_string(),
            version: "1.0.0".to_string(),
            strict: false,
        }
    }
}

/// Keys accepted in the config file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub router: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub router_object: Option<String>,
    pub title: Option<String>,
    pub version: Option<String>,
    pub strict: Option<bool>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub router: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub router_object: Option<String>,
    pub title: Option<String>,
    pub version: Option<String>,
    pub strict: bool,
}

impl Config {
    /// Resolves the configuration, with relative paths taken from `base` (the working directory).
    ///
    /// # Errors
    ///
    /// Fails if an explicitly requested config file does not exist or cannot be read.
    pub fn resolve(base: &Path, overrides: &Overrides) -> Result<Self> {
        let mut config = Self::default();

        let file = match &overrides.config {
            Some(path) => {
                let path = base.join(path);
                if !path.is_file() {
                    return Err(Error::InvalidArgument(format!(
                        "Config file does not exist: {}",
                        path.display()
                    ))
                    .into());
                }
                load_file(&path)?
            }
            None => {
                let path = base.join(CONFIG_FILE);
                if path.is_file() {
                    load_file(&path)?
                } else {
                    debug!("No {} in {}", CONFIG_FILE, base.display());
                    None
                }
            }
        };
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_overrides(overrides);

        config.router_dir = base.join(&config.router_dir);
        config.model_dir = base.join(&config.model_dir);
        config.output_dir = base.join(&config.output_dir);
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(router) = file.router {
            self.router_dir = router;
        }
        if let Some(model) = file.model {
            self.model_dir = model;
        }
        if let Some(output) = file.output {
            self.output_dir = output;
        }
        if let Some(router_object) = file.router_object {
            self.router_object = router_object;
        }
        if let Some(title) = file.title {
            self.title = title;
        }
        if let Some(version) = file.version {
            self.version = version;
        }
        if let Some(strict) = file.strict {
            self.strict = strict;
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        self.apply_file(FileConfig {
            router: overrides.router.clone(),
            model: overrides.model.clone(),
            output: overrides.output.clone(),
            router_object: overrides.router_object.clone(),
            title: overrides.title.clone(),
            version: overrides.version.clone(),
            strict: overrides.strict.then_some(true),
        });
    }

    /// Info object of the generated documents
    pub fn info(&self) -> Info {
        Info {
            title: self.title.clone(),
            version: self.version.clone(),
        }
    }
}

/// Reads a config file. A file that is not valid JSON is ignored with a warning.
///
/// # Errors
///
/// Fails only if the file cannot be read.
pub fn load_file(path: &Path) -> Result<Option<FileConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    match serde_json::from_str(&content) {
        Ok(file) => {
            info!("Using config file {}", path.display());
            Ok(Some(file))
        }
        Err(e) => {
            warn!("Ignoring invalid config file {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::resolve(dir.path(), &Overrides::default()).unwrap();

        assert_eq!(config.router_dir, dir.path().join("src/router"));
        assert_eq!(config.model_dir, dir.path().join("dist/src/model"));
        assert_eq!(config.output_dir, dir.path().join("swagger"));
        assert_eq!(config.router_object, "router");
        assert_eq!(config.info().title, "Sample API");
        assert_eq!(config.info().version, "1.0.0");
        assert!(!config.strict);
    }

    #[test]
    fn test_file_then_flags() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"router": "routes", "routerObject": "api", "title": "Shop", "strict": true}"#,
        )
        .unwrap();
        let overrides = Overrides {
            title: Some("Shop v2".to_string()),
            output: Some(PathBuf::from("docs")),
            ..Overrides::default()
        };

        let config = Config::resolve(dir.path(), &overrides).unwrap();

        assert_eq!(config.router_dir, dir.path().join("routes"));
        assert_eq!(config.output_dir, dir.path().join("docs"));
        assert_eq!(config.router_object, "api");
        assert_eq!(config.title, "Shop v2");
        assert!(config.strict);
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("custom.json"), r#"{"version": "2.0.0"}"#).unwrap();
        let overrides = Overrides {
            config: Some(PathBuf::from("custom.json")),
            ..Overrides::default()
        };

        let config = Config::resolve(dir.path(), &overrides).unwrap();
        assert_eq!(config.version, "2.0.0");
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides {
            config: Some(PathBuf::from("missing.json")),
            ..Overrides::default()
        };
        assert!(Config::resolve(dir.path(), &overrides).is_err());
    }

    #[test]
    fn test_invalid_config_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let config = Config::resolve(dir.path(), &Overrides::default()).unwrap();
        assert_eq!(config.router_object, "router");
    }
}
