use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use probe_core::config::ProbeConfig;
use probe_core::diagnostics::tracing_diagnostics;
use probe_core::model::Bundle;
use probe_core::services::identify::BinaryIdentifier;
use probe_core::services::locator::BundleLocator;
use serde::Serialize;

use crate::commands::EXIT_NO_BUNDLES;

#[derive(Debug, Serialize)]
pub struct BundleListing {
    pub name: String,
    pub root: PathBuf,
    pub payload: Option<PathBuf>,
}

/// Located bundles paired with their identified payloads.
pub fn collect_bundles(config: &ProbeConfig) -> Vec<BundleListing> {
    let locator = BundleLocator::new(
        config.component_roots.clone(),
        config.bundle_suffix.clone(),
        tracing_diagnostics(),
    );
    let identifier = BinaryIdentifier::new().with_diagnostics(tracing_diagnostics());
    locator
        .scan()
        .into_iter()
        .map(|bundle| {
            let payload = identifier.identify(&bundle).map(|p| p.path);
            BundleListing { name: bundle.name, root: bundle.root, payload }
        })
        .collect()
}

pub fn list_bundles_command(config: &ProbeConfig, json: bool) -> Result<()> {
    let bundles = collect_bundles(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    println!("Bundles ({}):", bundles.len());
    if bundles.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for bundle in bundles {
        let payload = bundle
            .payload
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no binary)".to_string());
        println!("  - {} [{}] payload={}", bundle.name, bundle.root.display(), payload);
    }

    Ok(())
}

/// Print the payload chosen for one bundle.
pub fn identify_command(bundle: &Path) -> Result<ExitCode> {
    let bundle = Bundle::new(bundle);
    match BinaryIdentifier::new().identify(&bundle) {
        Some(payload) => {
            println!("{}", payload.path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("No binary found in {}", bundle.root.display());
            Ok(ExitCode::from(EXIT_NO_BUNDLES))
        }
    }
}
