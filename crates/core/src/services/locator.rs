use std::path::PathBuf;

use crate::diagnostics::SharedDiagnostics;
use crate::model::Bundle;
use crate::services::list_suffixed_dirs;

const COMPONENT: &str = "locator";

/// Enumerates component bundles directly under each configured root.
pub struct BundleLocator {
    roots: Vec<PathBuf>,
    suffix: String,
    diagnostics: SharedDiagnostics,
}

impl BundleLocator {
    pub fn new(
        roots: Vec<PathBuf>,
        suffix: impl Into<String>,
        diagnostics: SharedDiagnostics,
    ) -> Self {
        Self { roots, suffix: suffix.into(), diagnostics }
    }

    /// Bundles in root order, sorted by path within a root. An empty result
    /// is not an error.
    pub fn scan(&self) -> Vec<Bundle> {
        self.diagnostics.info(COMPONENT, "Scanning for frameworks...");
        let suffixes = [self.suffix.clone()];
        let bundles: Vec<Bundle> = self
            .roots
            .iter()
            .flat_map(|root| list_suffixed_dirs(root, &suffixes, &*self.diagnostics, COMPONENT))
            .map(Bundle::new)
            .inspect(|b| {
                self.diagnostics.debug(COMPONENT, &format!("Found framework: {}", b.file_name()))
            })
            .collect();
        self.diagnostics.info(COMPONENT, &format!("Found {} frameworks", bundles.len()));
        bundles
    }
}
