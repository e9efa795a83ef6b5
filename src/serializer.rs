//! YAML codec for every artifact the generator reads or writes.
//!
//! Documents are serialized with `serde_yaml`; maps are insertion-ordered, so writing the same
//! document twice gives the same bytes and reading back gives an equal structure.

use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Serializes a document to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Reads and deserializes a YAML file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Reading YAML file: {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML in file: {}", path.display()))
}

/// Like [`read_yaml`], but a missing file is `Ok(None)`.
pub fn read_yaml_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path) {
        Ok(content) => serde_yaml::from_str(&content)
            .map(Some)
            .with_context(|| format!("Failed to parse YAML in file: {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read file: {}", path.display())),
    }
}

/// Serializes a document and writes it, creating parent directories.
pub fn write_yaml<T: Serialize>(doc: &T, path: &Path) -> Result<()> {
    let content = serialize_yaml(doc)?;
    write_to_file(&content, path)
}

/// Writes string content to a file.
///
/// Creates the file and its parent directories if they don't exist, or overwrites it if it does.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
