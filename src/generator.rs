//! The generation pipeline.
//!
//! One run: recover from an interrupted publish, stage, build the schema registry from the
//! models, scan the route files, assemble the documents, and publish (unless `strict` and
//! something was diagnosed).

use crate::assembler::{AssemblySummary, DocumentAssembler, SINGLE_DOCUMENT};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::model::{DescriptorIntrospector, ModelIntrospector};
use crate::publish::Staging;
use crate::registry::{RegistryBuilder, COMPONENT_DIR};
use crate::routes::{RouteScanner, ROUTER_DIR};
use crate::scanner::FileScanner;
use crate::serializer::read_yaml_opt;
use anyhow::Result;
use log::{debug, info, warn};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Everything a run needs, built once up front.
pub struct Context {
    pub config: Config,
    pub introspector: Box<dyn ModelIntrospector>,
}

impl Context {
    /// A context reading model descriptors with [`DescriptorIntrospector`].
    pub fn new(config: Config) -> Self {
        Self::with_introspector(config, Box::new(DescriptorIntrospector))
    }

    pub fn with_introspector(config: Config, introspector: Box<dyn ModelIntrospector>) -> Self {
        Self { config, introspector }
    }
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    pub models: usize,
    pub summary: AssemblySummary,
    pub diagnostics: Diagnostics,
    /// False when strict mode held the output back
    pub published: bool,
}

/// Runs the whole pipeline.
///
/// # Errors
///
/// Filesystem and codec failures abort the run; the published tree is then left as it was.
/// Problems confined to one model or route file are reported in [`RunReport::diagnostics`].
pub fn generate(context: &Context) -> Result<RunReport> {
    let config = &context.config;
    let staging = Staging::new(&config.output_dir);
    staging.recover()?;
    staging.prepare()?;

    let mut diagnostics = Diagnostics::new();

    let models = scan_dir(&config.model_dir, &mut diagnostics)?;
    info!("Processing {} model files", models.len());
    let registry = RegistryBuilder::new(
        &*context.introspector,
        &config.model_dir,
        &staging.staging_dir().join(COMPONENT_DIR),
    )
    .build(&models, &mut diagnostics)?;
    if registry.is_empty() {
        info!("No schemas registered; named @body/@response references will dangle");
    } else {
        debug!("{} schemas registered", registry.len());
    }

    let route_files = scan_dir(&config.router_dir, &mut diagnostics)?;
    info!("Scanning {} route files", route_files.len());
    let previous_router_dir = staging.live_dir().join(ROUTER_DIR);
    let scanner = RouteScanner::new(
        &config.router_dir,
        &config.router_object,
        &registry,
        &previous_router_dir,
    );

    let mut assembler = DocumentAssembler::new(config.info(), staging.staging_dir());
    for file in &route_files {
        if let Some(route_file) = scanner.scan_file(file, &mut diagnostics)? {
            assembler.add_route_file(&route_file)?;
        }
    }

    let previous_single_path = staging.live_dir().join(SINGLE_DOCUMENT);
    let previous_single = match read_yaml_opt::<Value>(&previous_single_path) {
        Ok(previous) => previous,
        Err(e) => {
            warn!("Ignoring previous {}: {:#}", previous_single_path.display(), e);
            None
        }
    };
    assembler.add_schemas(&registry, previous_single.as_ref());
    let summary = assembler.finish()?;

    let published = if config.strict && !diagnostics.is_empty() {
        warn!(
            "Strict mode: {} diagnostics, {} left unchanged",
            diagnostics.len(),
            staging.live_dir().display()
        );
        staging.discard()?;
        false
    } else {
        staging.publish()?;
        true
    };

    Ok(RunReport {
        models: models.len(),
        summary,
        diagnostics,
        published,
    })
}

/// Lists the files below `dir`. Anything the walk could not reach is recorded as a warning.
fn scan_dir(dir: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<PathBuf>> {
    let scan = FileScanner::new(dir.to_path_buf()).scan()?;
    for warning in scan.warnings {
        diagnostics.warning(dir, warning);
    }
    Ok(scan.files)
}
