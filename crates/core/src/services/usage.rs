use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ProbeConfig;
use crate::diagnostics::SharedDiagnostics;
use crate::model::UsageRecord;
use crate::services::list_suffixed_dirs;
use crate::tools::{run_text, ToolError, ToolInvocation, ToolRunner};

const COMPONENT: &str = "usage";

/// Marker preceding the class name in an Objective-C class reference symbol.
pub const OBJC_CLASS_MARKER: &str = "_OBJC_CLASS_$_";

/// Layer 2: which installed apps/bundles link the target, and which of its
/// classes they reference.
pub struct UsageCorrelator {
    roots: Vec<PathBuf>,
    suffixes: Vec<String>,
    otool: PathBuf,
    nm: PathBuf,
    runner: Arc<dyn ToolRunner>,
    diagnostics: SharedDiagnostics,
}

impl UsageCorrelator {
    pub fn new(
        config: &ProbeConfig,
        runner: Arc<dyn ToolRunner>,
        diagnostics: SharedDiagnostics,
    ) -> Self {
        Self {
            roots: config.dependent_roots.clone(),
            suffixes: config.dependent_suffixes.clone(),
            otool: config.tools.otool.clone(),
            nm: config.tools.nm.clone(),
            runner,
            diagnostics,
        }
    }

    pub fn correlate(
        &self,
        target_name: &str,
        known_classes: &BTreeSet<String>,
    ) -> Vec<UsageRecord> {
        self.diagnostics
            .info(COMPONENT, &format!("[Layer 2] Analyzing usage for {target_name}..."));
        let mut used_by = Vec::new();
        for root in &self.roots {
            let dirs = list_suffixed_dirs(root, &self.suffixes, &*self.diagnostics, COMPONENT);
            for candidate in dirs {
                let Some(binary) = bundle_binary(&candidate) else {
                    continue;
                };
                match self.inspect(&binary, target_name, known_classes) {
                    Ok(Some(used_classes)) => {
                        used_by.push(UsageRecord { path: candidate, binary, used_classes })
                    }
                    Ok(None) => {}
                    Err(e) => self.diagnostics.warn(
                        COMPONENT,
                        &format!("Skipping {}: {e}", candidate.display()),
                    ),
                }
            }
        }
        used_by
    }

    /// `None` when `binary` does not link the target.
    fn inspect(
        &self,
        binary: &Path,
        target_name: &str,
        known_classes: &BTreeSet<String>,
    ) -> Result<Option<Vec<String>>, ToolError> {
        let links =
            run_text(&*self.runner, &ToolInvocation::new(&self.otool).arg("-L").arg(binary))?;
        if !links_against(&links, target_name) {
            return Ok(None);
        }
        if known_classes.is_empty() {
            return Ok(Some(Vec::new()));
        }
        let symbols =
            run_text(&*self.runner, &ToolInvocation::new(&self.nm).arg("-u").arg(binary))?;
        Ok(Some(referenced_classes(&symbols, known_classes)))
    }
}

/// Main binary of an app or bundle: `Contents/MacOS/<name>`, else `<name>` at the root.
pub fn bundle_binary(bundle: &Path) -> Option<PathBuf> {
    let name = bundle.file_stem()?;
    [bundle.join("Contents").join("MacOS").join(name), bundle.join(name)]
        .into_iter()
        .find(|p| p.exists())
}

/// Substring test on link-listing output, not a dependency-graph parse. Any
/// install name passing through `/<name>.framework/` counts, so a binary that
/// only links a sub-framework nested inside the target is reported as linking
/// the target too.
pub fn links_against(link_listing: &str, framework_name: &str) -> bool {
    link_listing.contains(&format!("/{framework_name}.framework/"))
}

/// Class names referenced in `nm -u` output that are in `known`, sorted and
/// deduplicated.
pub fn referenced_classes(undefined_symbols: &str, known: &BTreeSet<String>) -> Vec<String> {
    undefined_symbols
        .lines()
        .filter(|line| line.contains(OBJC_CLASS_MARKER))
        .filter_map(|line| line.rsplit(OBJC_CLASS_MARKER).next())
        .map(str::trim)
        .filter(|name| known.contains(*name))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
