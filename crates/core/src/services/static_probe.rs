use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::config::ProbeConfig;
use crate::diagnostics::SharedDiagnostics;
use crate::model::{
    BinaryInfo, Bundle, BundleStructure, ClassDescriptor, Payload, Probed, StaticFacts,
    SwiftMetadata,
};
use crate::tools::{run_json, ToolError, ToolInvocation, ToolRunner};

const COMPONENT: &str = "static";

/// Name of the code-signing manifest inside `_CodeSignature/`.
pub const CODE_RESOURCES: &str = "CodeResources";

/// Layer 1: structural facts from radare2/rabin2 plus a scan of the bundle's
/// property lists. Never fails; each field degrades on its own.
pub struct StaticProber {
    config: ProbeConfig,
    runner: Arc<dyn ToolRunner>,
    diagnostics: SharedDiagnostics,
}

impl StaticProber {
    pub fn new(
        config: ProbeConfig,
        runner: Arc<dyn ToolRunner>,
        diagnostics: SharedDiagnostics,
    ) -> Self {
        Self { config, runner, diagnostics }
    }

    pub fn probe(&self, bundle: &Bundle, payload: &Payload) -> StaticFacts {
        self.diagnostics.info(COMPONENT, &format!("[Layer 1] Analyzing {}...", bundle.file_name()));
        StaticFacts {
            binary_info: self.binary_info(payload.path()),
            classes: self.classes(payload.path()),
            swift_metadata: self.swift_metadata(payload.path()),
            structure: Probed::ok(self.scan_structure(&bundle.root)),
        }
    }

    fn r2(&self, command: &str, binary: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.config.tools.radare2)
            .args(["-2", "-q", "-c", command])
            .arg(binary)
    }

    fn rabin2(&self, flag: &str, binary: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.config.tools.rabin2).args([flag, "-j"]).arg(binary)
    }

    fn degrade<T: Default>(&self, field: &str, err: ToolError) -> Probed<T> {
        if err.is_timeout() {
            self.diagnostics.warn(COMPONENT, &format!("Timeout extracting {field}: {err}"));
        } else {
            self.diagnostics.error(COMPONENT, &format!("Error extracting {field}: {err}"));
        }
        Probed::degraded(err.to_string())
    }

    pub fn binary_info(&self, binary: &Path) -> BinaryInfo {
        let info = match run_json::<Value>(&*self.runner, &self.rabin2("-I", binary)) {
            Ok(v) => Probed::ok(v),
            Err(e) => self.degrade("binary info", e),
        };
        let libraries = match run_json::<Value>(&*self.runner, &self.rabin2("-l", binary)) {
            Ok(v) => Probed::ok(parse_libraries(&v)),
            Err(e) => self.degrade("linked libraries", e),
        };
        BinaryInfo { info, libraries }
    }

    pub fn classes(&self, binary: &Path) -> Probed<Vec<ClassDescriptor>> {
        let inv = self.r2("icj", binary).timeout(self.config.timeouts.class_listing());
        match run_json::<Vec<Value>>(&*self.runner, &inv) {
            Ok(entries) => {
                let (classes, rejected) = parse_classes(entries);
                match rejected.first() {
                    None => Probed::ok(classes),
                    Some(first) => {
                        let diagnostic = format!(
                            "{} class entries not understood; first: {first}",
                            rejected.len()
                        );
                        self.diagnostics
                            .warn(COMPONENT, &format!("Incomplete classes: {diagnostic}"));
                        Probed::partial(classes, diagnostic)
                    }
                }
            }
            Err(e) => self.degrade("classes", e),
        }
    }

    pub fn swift_metadata(&self, binary: &Path) -> Probed<SwiftMetadata> {
        let inv = self.r2("isj", binary).timeout(self.config.timeouts.symbol_listing());
        match run_json::<Vec<Value>>(&*self.runner, &inv) {
            Ok(symbols) => Probed::ok(detect_swift(symbols, self.config.swift_symbol_cap)),
            Err(e) => self.degrade("swift metadata", e),
        }
    }

    /// Walk the bundle, recording every file and converting property lists.
    /// A plist that fails to convert is logged and left out.
    pub fn scan_structure(&self, root: &Path) -> BundleStructure {
        let mut structure = BundleStructure::default();
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string();
            structure.files.push(rel.clone());

            let is_plist = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("plist"))
                .unwrap_or(false);
            let is_code_resources = entry.file_name() == CODE_RESOURCES;
            if !is_plist && !is_code_resources {
                continue;
            }

            match self.plist_to_json(path) {
                Ok(doc) => {
                    if is_code_resources {
                        structure.code_resources = Some(doc.clone());
                    }
                    if is_plist {
                        structure.plists.insert(rel, doc);
                    }
                }
                Err(e) => {
                    self.diagnostics.warn(COMPONENT, &format!("Failed to parse plist {rel}: {e}"))
                }
            }
        }
        structure
    }

    fn plist_to_json(&self, path: &Path) -> Result<Value, ToolError> {
        let inv = ToolInvocation::new(&self.config.tools.plutil)
            .args(["-convert", "json", "-o", "-"])
            .arg(path);
        run_json(&*self.runner, &inv)
    }
}

/// Accepts a bare array or a `{"libs": [...]}` object; entries may be strings
/// or objects carrying a `name`.
pub fn parse_libraries(doc: &Value) -> Vec<String> {
    let entries: &[Value] = match doc {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("libs").or_else(|| map.get("libraries")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Split `icj` entries into named classes and the reasons the others were
/// rejected.
pub fn parse_classes(entries: Vec<Value>) -> (Vec<ClassDescriptor>, Vec<String>) {
    let mut classes = Vec::new();
    let mut rejected = Vec::new();
    for entry in entries {
        match ClassDescriptor::deserialize(entry) {
            Ok(class) if !class.name.is_empty() => classes.push(class),
            Ok(_) => rejected.push("class entry with an empty name".to_string()),
            Err(e) => rejected.push(e.to_string()),
        }
    }
    (classes, rejected)
}

/// Swift mangled names carry `$s` (`_$s` once the Mach-O underscore is added);
/// demangled names mention `Swift`.
pub fn is_swift_symbol(symbol: &Value) -> bool {
    let name = symbol.get("name").and_then(Value::as_str).unwrap_or_default();
    let demangled = symbol.get("demname").and_then(Value::as_str).unwrap_or_default();
    name.contains("$s") || demangled.contains("Swift")
}

pub fn detect_swift(symbols: Vec<Value>, cap: usize) -> SwiftMetadata {
    let matching: Vec<Value> = symbols.into_iter().filter(is_swift_symbol).take(cap).collect();
    SwiftMetadata { is_swift: !matching.is_empty(), symbols: matching }
}
