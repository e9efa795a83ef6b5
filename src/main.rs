//! OpenAPI generator for Express-style route files - command-line entry point.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes [--config FILE] [--router DIR] [--model DIR] [--output DIR]
//!                     [--routerObject NAME] [--title TITLE] [--version VERSION] [--strict] [-v]
//! ```
//!
//! # Examples
//!
//! Generate with the settings from `./swaggerconfig.json` (or the defaults):
//! ```bash
//! openapi-from-routes
//! ```
//!
//! Fail instead of publishing when anything was reported:
//! ```bash
//! openapi-from-routes --strict -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_routes::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI generator starting...");

    cli::run(args)?;

    Ok(())
}
