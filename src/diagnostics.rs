//! Structured diagnostics collected over one generation run.
//!
//! Problems that are isolated to a single model or route file never abort the run. They are
//! recorded here instead, logged as they happen, and handed back to the caller so that it can
//! decide whether the run counts as a failure (see `--strict`).

use log::{error, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Output was produced, possibly incomplete or with a dangling reference
    Warning,
    /// A whole file was left out of the output
    Error,
}

/// A single problem found while generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// The source file the problem belongs to
    pub file: PathBuf,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", label, self.file.display(), self.message)
    }
}

/// Ordered list of diagnostics.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and logs a warning.
    pub fn warning(&mut self, file: &Path, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            file: file.to_path_buf(),
            message: message.into(),
        };
        warn!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    /// Records and logs an error.
    pub fn error(&mut self, file: &Path, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            file: file.to_path_buf(),
            message: message.into(),
        };
        error!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
