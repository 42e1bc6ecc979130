//! Pipeline stages.
//!
//! Leaf-first: [`locator`] finds bundles, [`identify`] picks the payload,
//! then [`static_probe`], [`usage`] and [`load_probe`] each contribute one
//! part of the [`crate::model::AnalysisRecord`] assembled by [`pipeline`].

pub mod identify;
pub mod load_probe;
pub mod locator;
pub mod pipeline;
pub mod static_probe;
pub mod usage;

use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostics;

/// One-level listing of `root`, keeping entries that are real directories with
/// one of `suffixes` as extension. Unreadable or missing roots yield nothing.
pub(crate) fn list_suffixed_dirs(
    root: &Path,
    suffixes: &[String],
    diagnostics: &dyn Diagnostics,
    component: &'static str,
) -> Vec<PathBuf> {
    if !root.exists() {
        diagnostics.warn(component, &format!("Path does not exist: {}", root.display()));
        return Vec::new();
    }
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            diagnostics.warn(component, &format!("Cannot read {}: {e}", root.display()));
            return Vec::new();
        }
    };

    let mut out: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|ext| suffixes.iter().any(|s| s == ext))
                .unwrap_or(false)
        })
        .collect();
    out.sort();
    out
}
