use crate::config::{Config, Overrides};
use crate::generator::{generate, Context};
use anyhow::{Context as _, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI generator - builds swagger.yaml, per-file router documents and single.yaml from
/// annotated route files
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, about, long_about = None, disable_version_flag = true)]
pub struct CliArgs {
    /// JSON config file (default: ./swaggerconfig.json if present)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the route files
    #[arg(long = "router", value_name = "DIR")]
    pub router: Option<PathBuf>,

    /// Directory holding the model files
    #[arg(long = "model", value_name = "DIR")]
    pub model: Option<PathBuf>,

    /// Output directory
    #[arg(long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Identifier whose method calls register routes
    #[arg(long = "routerObject", value_name = "NAME")]
    pub router_object: Option<String>,

    /// API title written to info.title
    #[arg(long = "title", value_name = "TITLE")]
    pub title: Option<String>,

    /// API version written to info.version
    #[arg(long = "version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Do not publish if any warning or error was reported
    #[arg(long = "strict")]
    pub strict: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// The command-line layer of the configuration
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            router: self.router.clone(),
            model: self.model.clone(),
            output: self.output.clone(),
            router_object: self.router_object.clone(),
            title: self.title.clone(),
            version: self.version.clone(),
            strict: self.strict,
        }
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    debug!("Parsed arguments: {:?}", args);

    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let config = Config::resolve(&cwd, &args.overrides())?;

    info!("Router directory: {}", config.router_dir.display());
    info!("Model directory: {}", config.model_dir.display());
    info!("Output directory: {}", config.output_dir.display());
    debug!("Resolved config: {:?}", config);

    let context = Context::new(config);
    let report = generate(&context)?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Models: {}", report.models);
    info!("  - Route files: {}", report.summary.route_files);
    info!("  - Endpoints: {}", report.summary.endpoints);
    info!("  - Schemas: {}", report.summary.schemas);
    info!("  - Diagnostics: {}", report.diagnostics.len());
    if report.diagnostics.has_errors() {
        warn!("Some route files were left out of the output, see the errors above");
    }

    if !report.published {
        anyhow::bail!(
            "{} diagnostics reported in strict mode; output not published",
            report.diagnostics.len()
        );
    }
    Ok(())
}
