// Declare modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod language;
pub mod links;
pub mod models;
pub mod orchestrator;
pub mod paths;
pub mod scanner;

use anyhow::{Context, Result};
use clap::Parser;

use self::cli::Cli;
use self::config::resolve_config;
use self::engine::PandocEngine;
use self::error::RunError;
use self::formatter::OutputGenerator;
use self::models::RunReport;

/// Initializes components and orchestrates data flow.
pub fn run() -> Result<RunReport> {
    // 1. Parse Args
    let args = Cli::parse();

    // 2. Resolve Configuration
    let config = resolve_config(&args)?;

    // 3. Preconditions: input folder, then the engine
    if !args.input.is_dir() {
        return Err(RunError::InputNotFound(args.input.clone()).into());
    }
    let engine = PandocEngine::locate(config.engine_path.as_deref(), config.engine_timeout)?;
    match engine.version() {
        Some(version) => log::debug!("Using {} ({})", engine.program().display(), version),
        None => log::debug!("Using {}", engine.program().display()),
    }

    // 4. Convert
    let report = orchestrator::run(&args.input, &args.output, &config, &engine)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    // 5. Print summary to stdout
    let outcomes = OutputGenerator::generate_outcomes(&report.outcomes);
    let totals = OutputGenerator::generate_totals(&report);
    println!("{}", OutputGenerator::format_full_output(&outcomes, &totals));

    if !report.is_complete_success() {
        log::warn!("Finished with errors; output written to {}", args.output.display());
    }

    Ok(report)
}
