//! Data contracts shared by every pipeline stage and the report writer.
//!
//! An [`AnalysisRecord`] owns copies of everything it references; nothing in
//! here is shared between bundles once a record has been built.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A directory-based component bundle (e.g. `Foo.framework`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub root: PathBuf,
    /// Logical name, the bundle directory's stem (`Foo` for `Foo.framework`).
    pub name: String,
}

impl Bundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        Self { root, name }
    }

    /// Directory entry name including the suffix.
    pub fn file_name(&self) -> String {
        self.root.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
    }
}

/// The main executable selected for a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub path: PathBuf,
    /// True when the file passed the binary magic-number check.
    pub verified: bool,
}

impl Payload {
    pub fn verified(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), verified: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A single extracted field that either carries a tool-derived value or a
/// default plus the reason the real value could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probed<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl<T> Probed<T> {
    pub fn ok(value: T) -> Self {
        Self { value, diagnostic: None }
    }

    /// A usable value that is known to be incomplete.
    pub fn partial(value: T, diagnostic: impl Into<String>) -> Self {
        Self { value, diagnostic: Some(diagnostic.into()) }
    }

    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }
}

impl<T: Default> Probed<T> {
    pub fn degraded(diagnostic: impl Into<String>) -> Self {
        Self { value: T::default(), diagnostic: Some(diagnostic.into()) }
    }
}

impl<T: Default> Default for Probed<T> {
    fn default() -> Self {
        Self::ok(T::default())
    }
}

/// Binary format metadata and the linked-library list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryInfo {
    /// Raw `rabin2 -I -j` document; `Null` when unavailable.
    pub info: Probed<serde_json::Value>,
    pub libraries: Probed<Vec<String>>,
}

impl BinaryInfo {
    pub fn is_empty(&self) -> bool {
        self.info.value.is_null() && self.libraries.value.is_empty()
    }
}

/// Superclass as emitted by the disassembler: a single name, or the
/// inheritance chain nearest-first in newer radare2 releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Superclass {
    Name(String),
    Chain(Vec<String>),
}

impl Superclass {
    /// Immediate superclass name.
    pub fn immediate(&self) -> Option<&str> {
        match self {
            Superclass::Name(name) => Some(name.as_str()),
            Superclass::Chain(chain) => chain.first().map(String::as_str),
        }
    }
}

/// A class/type listed by the disassembler. Keys not modelled here are kept
/// verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    #[serde(alias = "classname")]
    pub name: String,
    #[serde(default, alias = "super", skip_serializing_if = "Option::is_none")]
    pub superclass: Option<Superclass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Swift runtime detection from exported symbol mangling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwiftMetadata {
    pub is_swift: bool,
    /// Matching symbol records, capped.
    pub symbols: Vec<serde_json::Value>,
}

/// Non-executable contents of the bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleStructure {
    /// Every regular file, relative to the bundle root.
    pub files: Vec<String>,
    /// Property lists converted to JSON, keyed by relative path.
    pub plists: BTreeMap<String, serde_json::Value>,
    pub code_resources: Option<serde_json::Value>,
}

/// Static inspection summary for one payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticFacts {
    pub binary_info: BinaryInfo,
    pub classes: Probed<Vec<ClassDescriptor>>,
    pub swift_metadata: Probed<SwiftMetadata>,
    pub structure: Probed<BundleStructure>,
}

impl StaticFacts {
    pub fn class_names(&self) -> std::collections::BTreeSet<String> {
        self.classes.value.iter().map(|c| c.name.clone()).collect()
    }
}

/// An external bundle that links against the analysed framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub path: PathBuf,
    pub binary: PathBuf,
    /// Subset of the target's known classes referenced by `binary`.
    pub used_classes: Vec<String>,
}

/// Classification of a load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded,
    LoadFailed,
    Crashed,
    TimedOut,
    SkippedUnsafe,
    SkippedNoBinary,
    Error,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Loaded => "loaded",
            LoadStatus::LoadFailed => "load_failed",
            LoadStatus::Crashed => "crashed",
            LoadStatus::TimedOut => "timed_out",
            LoadStatus::SkippedUnsafe => "skipped_unsafe",
            LoadStatus::SkippedNoBinary => "skipped_no_binary",
            LoadStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub status: LoadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl LoadOutcome {
    pub fn new(status: LoadStatus) -> Self {
        Self { status, diagnostic: None }
    }

    pub fn with_diagnostic(status: LoadStatus, diagnostic: impl Into<String>) -> Self {
        Self { status, diagnostic: Some(diagnostic.into()) }
    }
}

/// Output of the optional header-recovery tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDump {
    pub tool: String,
    pub dump_size: usize,
    pub preview: String,
}

/// Runtime stage result: exactly one load outcome, plus headers when the
/// recovery tool is installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeFacts {
    pub load: LoadOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Probed<Option<HeaderDump>>>,
}

/// Aggregate handed to the report writer; every stage is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub framework: String,
    pub name: String,
    pub bundle_path: PathBuf,
    pub binary_path: PathBuf,
    #[serde(rename = "static")]
    pub static_facts: StaticFacts,
    pub usage: Vec<UsageRecord>,
    pub runtime: RuntimeFacts,
    pub analyzed_at: String,
}
