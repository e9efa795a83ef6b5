//! Route scanning: from one route registration file to its endpoints.
//!
//! Every call site found by the [`CallSiteLexer`] whose method is an HTTP verb becomes an
//! endpoint. The quoted path template gives the OpenAPI path and its path parameters, an
//! `auth(` call before the handler marks the endpoint as JWT protected, and the documentation
//! block above the call fills in the rest.

use crate::annotation::Annotations;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::lexer::{CallSite, CallSiteLexer};
use crate::openapi::{
    OperationEntry, Operation, Parameter, RequestBody, Response, RouterDocument,
    SecurityRequirement, JWT_SCHEME,
};
use crate::registry::SchemaRegistry;
use crate::scanner::{pointer_path, relative_document_path};
use crate::schema::Schema;
use crate::serializer::read_yaml_opt;
use crate::shorthand;
use anyhow::Context;
use log::{debug, warn};
use regex::Regex;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Methods that register an endpoint. Anything else (`use`, `param`, `route`) is skipped.
pub const HTTP_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Directory holding router documents, relative to the output root.
pub const ROUTER_DIR: &str = "router";

fn path_param_regex() -> &'static Regex {
    static PATH_PARAM: OnceLock<Regex> = OnceLock::new();
    PATH_PARAM.get_or_init(|| Regex::new(r"/:(\w+)").expect("valid path parameter regex"))
}

/// One endpoint found in a route file.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// OpenAPI path template, e.g. `/users/{id}`
    pub template: String,
    /// Key of the path inside the router document, e.g. `users-{id}`
    pub edited_key: String,
    /// Lowercase HTTP method
    pub method: String,
    pub entry: OperationEntry,
}

/// The endpoints of one route file, in textual order.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFile {
    pub source: PathBuf,
    /// Router document path relative to `router/`, e.g. `admin/users.yaml`
    pub relative: PathBuf,
    pub endpoints: Vec<Endpoint>,
}

impl RouteFile {
    /// The router document; a later endpoint with the same key and method replaces an earlier one.
    pub fn document(&self) -> RouterDocument {
        let mut document = RouterDocument::default();
        for endpoint in &self.endpoints {
            document
                .paths
                .entry(endpoint.edited_key.clone())
                .or_default()
                .insert(endpoint.method.clone(), endpoint.entry.clone());
        }
        document
    }

    /// Cross-file pointer to `edited_key` in this file's router document.
    pub fn pointer(&self, edited_key: &str) -> String {
        format!(
            "./{}/{}#/paths/{}",
            ROUTER_DIR,
            pointer_path(&self.relative),
            edited_key
        )
    }
}

/// `/users/:id` -> `/users/{id}`
pub fn openapi_template(template: &str) -> String {
    path_param_regex()
        .replace_all(template, "/{${1}}")
        .into_owned()
}

/// `/users/{id}` -> `users-{id}`
pub fn edited_key(template: &str) -> String {
    let key = template.replace('/', "-");
    match key.strip_prefix('-') {
        Some(stripped) => stripped.to_string(),
        None => key,
    }
}

/// Names of every `/:name` segment, in order.
pub fn path_parameters(template: &str) -> Vec<String> {
    path_param_regex()
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// `users` -> `Users`
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turns route files into endpoints.
pub struct RouteScanner<'a> {
    router_dir: &'a Path,
    router_object: &'a str,
    registry: &'a SchemaRegistry,
    /// Published `router/` directory of the previous run, read for `@manual`
    previous_dir: &'a Path,
}

impl<'a> RouteScanner<'a> {
    pub fn new(
        router_dir: &'a Path,
        router_object: &'a str,
        registry: &'a SchemaRegistry,
        previous_dir: &'a Path,
    ) -> Self {
        Self {
            router_dir,
            router_object,
            registry,
            previous_dir,
        }
    }

    /// Scans one route file.
    ///
    /// Returns `Ok(None)` for files without router calls and for files with a call site that
    /// cannot be understood; the latter is recorded as an error diagnostic and none of the
    /// file's endpoints are kept.
    ///
    /// # Errors
    ///
    /// Fails only if the file cannot be read. Content that is not UTF-8 is decoded lossily, so
    /// binary files end up as files without router calls.
    pub fn scan_file(&self, file: &Path, diagnostics: &mut Diagnostics) -> anyhow::Result<Option<RouteFile>> {
        let bytes = fs::read(file).with_context(|| format!("Failed to read route file: {}", file.display()))?;
        let source = String::from_utf8_lossy(&bytes);
        let relative = relative_document_path(self.router_dir, file);

        let previous_path = self.previous_dir.join(&relative);
        let previous = match read_yaml_opt::<Value>(&previous_path) {
            Ok(previous) => previous,
            Err(e) => {
                warn!("Ignoring unreadable previous output {}: {:#}", previous_path.display(), e);
                None
            }
        };

        match self.scan_source(file, &relative, &source, previous.as_ref(), diagnostics) {
            Ok(route_file) => Ok(route_file),
            Err(Error::UnrecognizedRoute { message, .. }) => {
                diagnostics.error(file, format!("file skipped: {}", message));
                Ok(None)
            }
            Err(e) => {
                diagnostics.error(file, format!("file skipped: {}", e));
                Ok(None)
            }
        }
    }

    /// Scans the text of a route file.
    ///
    /// `previous` is the router document published for this file by the previous run.
    pub fn scan_source(
        &self,
        file: &Path,
        relative: &Path,
        source: &str,
        previous: Option<&Value>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<RouteFile>> {
        let call_sites = CallSiteLexer::new(source, self.router_object).call_sites();
        if call_sites.is_empty() {
            debug!("No `{}.` calls in {}, not a route file", self.router_object, file.display());
            return Ok(None);
        }

        let default_tag = relative
            .file_stem()
            .map(|stem| capitalize(&stem.to_string_lossy()))
            .unwrap_or_default();

        let mut endpoints = Vec::new();
        for site in &call_sites {
            if let Some(endpoint) = self.endpoint(file, site, &default_tag, previous, diagnostics)? {
                endpoints.push(endpoint);
            }
        }

        debug!("Found {} endpoints in {}", endpoints.len(), file.display());
        Ok(Some(RouteFile {
            source: file.to_path_buf(),
            relative: relative.to_path_buf(),
            endpoints,
        }))
    }

    fn endpoint(
        &self,
        file: &Path,
        site: &CallSite<'_>,
        default_tag: &str,
        previous: Option<&Value>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Endpoint>> {
        let method = site.method().to_ascii_lowercase();
        if !HTTP_METHODS.contains(&method.as_str()) {
            debug!("Skipping `{}.{}` in {}", self.router_object, site.method(), file.display());
            return Ok(None);
        }

        let literal = match &site.first_literal {
            Some(literal) if !literal.interpolated => literal,
            Some(_) => {
                return Err(Error::UnrecognizedRoute {
                    file: file.to_path_buf(),
                    message: format!("`{}` route path at byte {} is an interpolated template", method, site.offset),
                })
            }
            None => {
                return Err(Error::UnrecognizedRoute {
                    file: file.to_path_buf(),
                    message: format!("`{}` route at byte {} has no quoted path", method, site.offset),
                })
            }
        };

        let annotations = site.doc_block.map(Annotations::parse).unwrap_or_else(Annotations::none);
        let template = openapi_template(&literal.value);
        let key = edited_key(&template);

        if annotations.ignore {
            debug!("Ignoring {} {}", method, template);
            return Ok(None);
        }

        if annotations.manual {
            let kept = previous
                .and_then(|doc| doc.get("paths"))
                .and_then(|paths| paths.get(key.as_str()))
                .and_then(|item| item.get(method.as_str()))
                .filter(|operation| !operation.is_null());
            if let Some(operation) = kept {
                debug!("Keeping manual {} {}", method, template);
                return Ok(Some(Endpoint {
                    template,
                    edited_key: key,
                    method,
                    entry: OperationEntry::Manual(operation.clone()),
                }));
            }
            debug!("No previous output for manual {} {}, generating", method, template);
        }

        let mut operation = Operation {
            parameters: path_parameters(&literal.value)
                .into_iter()
                .map(Parameter::path)
                .collect(),
            ..Operation::default()
        };

        let before_handler = site.segment.split("(req").next().unwrap_or("");
        if before_handler.contains("auth(") {
            let mut requirement = SecurityRequirement::new();
            requirement.insert(JWT_SCHEME.to_string(), Vec::new());
            operation.security = Some(vec![requirement]);
        }

        operation.description = annotations.description;
        operation.summary = annotations.summary;
        operation.tags = Some(vec![annotations.tag.unwrap_or_else(|| default_tag.to_string())]);
        operation
            .parameters
            .extend(annotations.queries.into_iter().map(|(name, description)| Parameter::query(name, description)));

        if let Some(body) = annotations.body {
            if let Some(schema) = self.payload_schema(file, "@body", &body, diagnostics) {
                operation.request_body = Some(RequestBody::json(schema));
            }
        }
        if let Some(response) = annotations.response {
            if let Some(schema) = self.payload_schema(file, "@response", &response, diagnostics) {
                operation.responses.insert("200".to_string(), Response::json(schema));
            }
        }

        Ok(Some(Endpoint {
            template,
            edited_key: key,
            method,
            entry: OperationEntry::Generated(operation),
        }))
    }

    /// Schema of a `@body` / `@response` value: an inline literal or a registry reference.
    ///
    /// Unknown names still produce a (dangling) local pointer; malformed literals produce none.
    fn payload_schema(&self, file: &Path, tag: &str, value: &str, diagnostics: &mut Diagnostics) -> Option<Schema> {
        if value.starts_with('{') {
            return match shorthand::to_body_schema(value) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    diagnostics.warning(file, format!("{} ignored: {}", tag, e));
                    None
                }
            };
        }

        match self.registry.resolve(value) {
            Some(entry) => Some(Schema::reference(entry.locator.clone())),
            None => {
                diagnostics.warning(file, format!("{} references unknown schema `{}`", tag, value));
                Some(Schema::reference(format!("#/components/schemas/{}", value)))
            }
        }
    }
}
