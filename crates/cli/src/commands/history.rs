use anyhow::{Context, Result};
use probe_core::db::{OutputLayout, RunIndex};

use crate::canonicalize_or_current;

/// List persisted runs from `<output>/.probe/runs.db`.
pub fn history_command(output: &str, component: Option<&str>, json: bool) -> Result<()> {
    let layout = OutputLayout::new(canonicalize_or_current(output)?);
    let runs = if layout.index_path.exists() {
        let index = RunIndex::open(&layout.index_path).with_context(|| {
            format!("Failed to open run index at {}", layout.index_path.display())
        })?;
        index.list_runs(component).context("Failed to list runs")?
    } else {
        Vec::new()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    println!("Runs ({}):", runs.len());
    if runs.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for run in runs {
        let hash = run.payload_hash.as_deref().unwrap_or("-");
        println!(
            "  - {} [{}] classes={} used_by={} swift={} at={} hash={}",
            run.component,
            run.load_status,
            run.class_count,
            run.used_by_count,
            run.is_swift,
            run.analyzed_at,
            hash
        );
    }

    Ok(())
}
