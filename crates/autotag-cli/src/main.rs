mod args;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use autotag_library::{AppConfig, DirScanner, Orchestrator, RunSummary};
use autotag_paths::AutotagPaths;
use autotag_probe::Probe;
use clap::Parser;
use tracing::{error, info, warn};

use crate::args::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("autotag: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Solo devuelve error si la ejecución no puede empezar (configuración, rutas, lock).
fn run(args: &Args) -> Result<RunSummary> {
    let paths = AutotagPaths::new()?;
    let log_file = args.log_file.then_some(paths.log_file.as_path());
    logging::init(&args.log_level, log_file)?;

    let _lock = paths.lock()?;

    let config_path = args.config.clone().unwrap_or_else(|| paths.config_file.clone());
    info!(path = %config_path.display(), "cargando configuración");
    let app = AppConfig::from_file(&config_path)
        .with_context(|| format!("cannot load {}", config_path.display()))?;
    let specs = app.enabled_pipelines()?;
    if specs.is_empty() {
        warn!("nada que hacer: ningún pipeline habilitado");
        return Ok(RunSummary::default());
    }

    let probe = Probe::builder().intra_threads(app.intra_threads).build();
    let orchestrator = Orchestrator::new(probe)
        .with_discovery(DirScanner::new(app.extensions.iter().copied()))
        .show_progress(!args.no_progress);

    Ok(orchestrator.run(&specs)?)
}

fn print_summary(summary: &RunSummary) {
    println!("Groups processed : {}", summary.groups_processed);
    println!("Groups skipped   : {}", summary.groups_skipped);
    println!("Files processed  : {}", summary.files_processed);
    println!("Files failed     : {}", summary.files_failed);
    println!("Tags written     : {}", summary.tags_written);
    println!("Diagnostics      : {}", summary.diagnostics.len());
    for diagnostic in &summary.diagnostics {
        println!("  {diagnostic}");
    }
}
