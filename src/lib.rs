//! OpenAPI Generator - static OpenAPI documentation from annotated Express-style route files.
//!
//! The generator reads route registration files (`router.get('/users/:id', ...)`) together with
//! the `/** ... */` documentation blocks above each call, and model descriptors, and publishes
//! an OpenAPI 3.1 document set in YAML:
//!
//! - `swagger.yaml`: entry document whose paths point into the router documents;
//! - `router/<file>.yaml`: the operations of one route file;
//! - `component/<model>.yaml`: schema fragments, one file per model;
//! - `single.yaml`: everything inlined into one document.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively lists model and route files
//! 2. [`model`] / [`registry`] - Introspect models, write fragments, index schemas by name
//! 3. [`lexer`] - Finds router call sites and their documentation blocks
//! 4. [`annotation`] / [`shorthand`] - Parse documentation tags and inline object literals
//! 5. [`routes`] - Turn call sites into OpenAPI operations
//! 6. [`assembler`] - Build the router, main and single documents
//! 7. [`publish`] - Stage the tree and swap it in atomically
//! 8. [`generator`] - Run the whole pipeline
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::config::{Config, Overrides};
//! use openapi_from_routes::generator::{generate, Context};
//! use std::path::Path;
//!
//! let config = Config::resolve(Path::new("."), &Overrides::default()).unwrap();
//! let report = generate(&Context::new(config)).unwrap();
//! for diagnostic in report.diagnostics.iter() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod annotation;
pub mod assembler;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod model;
pub mod openapi;
pub mod publish;
pub mod registry;
pub mod routes;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod shorthand;
