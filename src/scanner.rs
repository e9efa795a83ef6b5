use anyhow::Result;
use log::debug;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for traversing the route and model directories.
///
/// The `FileScanner` recursively walks a directory and lists every regular file below it,
/// sorted by file name at each level so that generated documents come out in the same order
/// on every run.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./src/router"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} files", result.files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of directory scanning operation.
///
/// Contains the list of discovered files and any warnings encountered during scanning.
pub struct ScanResult {
    /// Paths to all discovered regular files, in walk order
    pub files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all regular files.
    ///
    /// A missing root directory yields an empty result with a warning; a project without models
    /// is not an error. Entries that cannot be accessed are recorded as warnings and skipped.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        if !self.root_path.is_dir() {
            let warning = format!("Directory does not exist: {}", self.root_path.display());
            debug!("{}", warning);
            warnings.push(warning);
            return Ok(ScanResult { files, warnings });
        }

        for entry in WalkDir::new(&self.root_path).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    debug!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!("Found {} files under {}", files.len(), self.root_path.display());
        Ok(ScanResult { files, warnings })
    }
}

/// Path of the YAML document generated for `file`, relative to `root`.
///
/// `src/router/admin/users.js` under `src/router` becomes `admin/users.yaml`.
pub fn relative_document_path(root: &Path, file: &Path) -> PathBuf {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative.with_extension("yaml")
}

/// Renders a relative path with `/` separators, as used inside `$ref` pointers.
pub fn pointer_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_nested_directories_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::write(root.join("c.js"), "").unwrap();
        fs::write(root.join("a.js"), "").unwrap();
        fs::write(root.join("b/inner/d.js"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        let relative: Vec<String> = result
            .files
            .iter()
            .map(|p| pointer_path(p.strip_prefix(root).unwrap()))
            .collect();

        assert_eq!(relative, vec!["a.js", "b/inner/d.js", "c.js"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();

        assert!(result.files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().join("missing")).scan().unwrap();

        assert!(result.files.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_relative_document_path() {
        let root = Path::new("/project/src/router");
        let file = Path::new("/project/src/router/admin/users.js");

        assert_eq!(
            relative_document_path(root, file),
            PathBuf::from("admin/users.yaml")
        );
    }

    #[test]
    fn test_relative_document_path_without_extension() {
        let root = Path::new("models");
        assert_eq!(
            relative_document_path(root, Path::new("models/user")),
            PathBuf::from("user.yaml")
        );
    }

    #[test]
    fn test_pointer_path_uses_forward_slashes() {
        let relative: PathBuf = ["admin", "users.yaml"].iter().collect();
        assert_eq!(pointer_path(&relative), "admin/users.yaml");
    }
}
