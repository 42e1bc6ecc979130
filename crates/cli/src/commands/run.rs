use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use probe_core::config::{LoaderCommand, ProbeConfig};
use probe_core::db::OutputLayout;
use probe_core::diagnostics::tracing_diagnostics;
use probe_core::report::FileReportWriter;
use probe_core::services::pipeline::Pipeline;
use probe_core::tools::{preflight, SystemRunner};
use tracing::{error, info, warn};

use crate::canonicalize_or_current;
use crate::commands::{EXIT_MISSING_TOOL, EXIT_NO_BUNDLES};

/// Preflight, scan, analyse and persist every component bundle.
pub fn run_command(config: &ProbeConfig, output: &str, limit: usize) -> Result<ExitCode> {
    let runner = Arc::new(SystemRunner::new(config.max_tool_output_bytes));
    if let Err(err) = preflight(&config.tools, runner.as_ref()) {
        error!("{err}");
        return Ok(ExitCode::from(EXIT_MISSING_TOOL));
    }

    let loader = match &config.loader {
        Some(loader) => loader.clone(),
        None => LoaderCommand::current_exe_helper()?,
    };
    let pipeline = Pipeline::new(config, loader, runner.clone(), runner, tracing_diagnostics())
        .with_limit(limit);

    let bundles = pipeline.scan();
    if bundles.is_empty() {
        warn!("No frameworks found under the configured component roots");
        return Ok(ExitCode::from(EXIT_NO_BUNDLES));
    }

    let root = canonicalize_or_current(output)?;
    let layout = OutputLayout::new(&root);
    let writer = FileReportWriter::create(layout)
        .with_context(|| format!("Failed to prepare output directory {}", root.display()))?;
    let summary = pipeline.with_sink(Box::new(writer)).run_bundles(bundles);

    info!(
        "Analysed {} of {} frameworks ({} skipped)",
        summary.records.len(),
        summary.discovered,
        summary.skipped.len()
    );
    println!("Analysed {} frameworks", summary.records.len());
    println!("  Output: {}", root.display());
    for skipped in &summary.skipped {
        println!("  Skipped {}: {}", skipped.bundle.file_name(), skipped.reason);
    }

    Ok(ExitCode::SUCCESS)
}
