use std::sync::Arc;

use chrono::Utc;

use crate::config::{LoaderCommand, ProbeConfig};
use crate::diagnostics::SharedDiagnostics;
use crate::model::{AnalysisRecord, Bundle};
use crate::report::ReportSink;
use crate::services::identify::BinaryIdentifier;
use crate::services::load_probe::LoadProbe;
use crate::services::locator::BundleLocator;
use crate::services::static_probe::StaticProber;
use crate::services::usage::UsageCorrelator;
use crate::tools::ToolRunner;

const COMPONENT: &str = "pipeline";

/// A bundle that produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBundle {
    pub bundle: Bundle,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub discovered: usize,
    pub records: Vec<AnalysisRecord>,
    pub skipped: Vec<SkippedBundle>,
}

/// Sequential driver: locate, then for each bundle identify and run the
/// three analysis layers before handing the record to the sink.
pub struct Pipeline {
    locator: BundleLocator,
    identifier: BinaryIdentifier,
    static_prober: StaticProber,
    usage: UsageCorrelator,
    load_probe: LoadProbe,
    sink: Option<Box<dyn ReportSink>>,
    limit: Option<usize>,
    diagnostics: SharedDiagnostics,
}

impl Pipeline {
    /// Wire every stage from one config. `tools` serves the static and usage
    /// layers; `loader_runner` spawns load-probe children.
    pub fn new(
        config: &ProbeConfig,
        loader: LoaderCommand,
        tools: Arc<dyn ToolRunner>,
        loader_runner: Arc<dyn ToolRunner>,
        diagnostics: SharedDiagnostics,
    ) -> Self {
        let identifier = BinaryIdentifier::new().with_diagnostics(diagnostics.clone());
        Self {
            locator: BundleLocator::new(
                config.component_roots.clone(),
                config.bundle_suffix.clone(),
                diagnostics.clone(),
            ),
            identifier: identifier.clone(),
            static_prober: StaticProber::new(config.clone(), tools.clone(), diagnostics.clone()),
            usage: UsageCorrelator::new(config, tools, diagnostics.clone()),
            load_probe: LoadProbe::new(config.clone(), loader, loader_runner, diagnostics.clone())
                .with_identifier(identifier),
            sink: None,
            limit: None,
            diagnostics,
        }
    }

    /// Replace payload selection for every stage at once.
    pub fn with_identifier(mut self, identifier: BinaryIdentifier) -> Self {
        self.load_probe = self.load_probe.with_identifier(identifier.clone());
        self.identifier = identifier;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Stop after this many analysed bundles; `0` means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn scan(&self) -> Vec<Bundle> {
        self.locator.scan()
    }

    /// Analyse one bundle; `None` when it has no payload.
    pub fn analyze(&self, bundle: &Bundle) -> Option<AnalysisRecord> {
        let payload = self.identifier.identify(bundle)?;
        self.diagnostics.info(COMPONENT, &format!("Processing {}...", bundle.file_name()));

        let static_facts = self.static_prober.probe(bundle, &payload);
        let usage = self.usage.correlate(&bundle.name, &static_facts.class_names());
        let runtime = self.load_probe.analyze_payload(bundle, Some(&payload));

        Some(AnalysisRecord {
            framework: bundle.file_name(),
            name: bundle.name.clone(),
            bundle_path: bundle.root.clone(),
            binary_path: payload.path,
            static_facts,
            usage,
            runtime,
            analyzed_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn run_bundles(&self, bundles: Vec<Bundle>) -> RunSummary {
        let mut summary = RunSummary { discovered: bundles.len(), ..Default::default() };
        for bundle in bundles {
            if self.limit.is_some_and(|limit| summary.records.len() >= limit) {
                break;
            }
            let Some(record) = self.analyze(&bundle) else {
                self.diagnostics
                    .warn(COMPONENT, &format!("Skipping {}: No binary found", bundle.file_name()));
                summary
                    .skipped
                    .push(SkippedBundle { bundle, reason: "no binary found".to_string() });
                continue;
            };
            if let Some(sink) = &self.sink {
                match sink.persist(&record) {
                    Ok(paths) => self.diagnostics.info(
                        COMPONENT,
                        &format!("[Layer 4] Saved data to {}", paths.data.display()),
                    ),
                    Err(e) => self
                        .diagnostics
                        .error(COMPONENT, &format!("Failed to persist {}: {e}", record.framework)),
                }
            }
            summary.records.push(record);
        }
        self.diagnostics
            .info(COMPONENT, &format!("Processed {} frameworks", summary.records.len()));
        summary
    }

    pub fn run(&self) -> RunSummary {
        self.run_bundles(self.scan())
    }
}
