use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
///
/// Filesystem and codec failures at workflow boundaries are reported through `anyhow` with
/// context; these variants are the failures the library itself recognises.
#[derive(Debug)]
pub enum Error {
    /// A route call site the scanner cannot make sense of (e.g. no quoted path literal)
    UnrecognizedRoute { file: PathBuf, message: String },
    /// An inline `{name: type}` literal that does not parse
    ShorthandLiteral { literal: String, message: String },
    /// A model descriptor that could not be turned into a schema fragment
    Introspection { file: PathBuf, message: String },
    InvalidArgument(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnrecognizedRoute { file, message } => {
                write!(f, "Unrecognized route in {}: {}", file.display(), message)
            }
            Error::ShorthandLiteral { literal, message } => {
                write!(f, "Invalid object literal `{}`: {}", literal, message)
            }
            Error::Introspection { file, message } => {
                write!(f, "Cannot introspect model {}: {}", file.display(), message)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
