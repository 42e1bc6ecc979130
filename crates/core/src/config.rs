use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Wall-clock limits for tools known to hang on adversarial input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub class_listing_ms: u64,
    pub symbol_listing_ms: u64,
    pub header_dump_ms: u64,
    pub load_probe_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            class_listing_ms: 30_000,
            symbol_listing_ms: 30_000,
            header_dump_ms: 30_000,
            load_probe_ms: 5_000,
        }
    }
}

impl Timeouts {
    pub fn class_listing(&self) -> Duration {
        Duration::from_millis(self.class_listing_ms)
    }

    pub fn symbol_listing(&self) -> Duration {
        Duration::from_millis(self.symbol_listing_ms)
    }

    pub fn header_dump(&self) -> Duration {
        Duration::from_millis(self.header_dump_ms)
    }

    pub fn load_probe(&self) -> Duration {
        Duration::from_millis(self.load_probe_ms)
    }
}

/// Program names (or paths) of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub radare2: PathBuf,
    pub rabin2: PathBuf,
    pub otool: PathBuf,
    pub nm: PathBuf,
    pub plutil: PathBuf,
    pub class_dump: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            radare2: PathBuf::from("r2"),
            rabin2: PathBuf::from("rabin2"),
            otool: PathBuf::from("otool"),
            nm: PathBuf::from("nm"),
            plutil: PathBuf::from("plutil"),
            class_dump: PathBuf::from("class-dump"),
        }
    }
}

impl ToolPaths {
    /// Apply `PROBE_R2_BIN` / `PROBE_RABIN2_BIN` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(p) = std::env::var_os("PROBE_R2_BIN") {
            self.radare2 = PathBuf::from(p);
        }
        if let Some(p) = std::env::var_os("PROBE_RABIN2_BIN") {
            self.rabin2 = PathBuf::from(p);
        }
        self
    }
}

/// Command used to spawn the load-probe child. The payload path is appended
/// as the final argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LoaderCommand {
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    /// The running executable re-invoked with its hidden `load-helper` subcommand.
    pub fn current_exe_helper() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to resolve current executable")?;
        Ok(Self::new(exe, ["load-helper"]))
    }
}

fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Run configuration. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Directories listed (one level) for component bundles.
    pub component_roots: Vec<PathBuf>,
    /// Directory extension identifying a component bundle.
    pub bundle_suffix: String,
    /// Directories listed (one level) for potential dependents.
    pub dependent_roots: Vec<PathBuf>,
    pub dependent_suffixes: Vec<String>,
    /// Only bundles under one of these roots are ever loaded.
    pub trusted_roots: Vec<PathBuf>,
    pub timeouts: Timeouts,
    pub swift_symbol_cap: usize,
    pub max_tool_output_bytes: usize,
    pub header_preview_chars: usize,
    pub tools: ToolPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderCommand>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            component_roots: vec![PathBuf::from("/System/Library/PrivateFrameworks")],
            bundle_suffix: "framework".to_string(),
            dependent_roots: vec![
                PathBuf::from("/System/Applications"),
                PathBuf::from("/System/Library/CoreServices"),
            ],
            dependent_suffixes: vec!["app".to_string(), "bundle".to_string()],
            trusted_roots: vec![PathBuf::from("/System")],
            timeouts: Timeouts::default(),
            swift_symbol_cap: 100,
            max_tool_output_bytes: 64 * 1024 * 1024,
            header_preview_chars: 500,
            tools: ToolPaths::default(),
            loader: None,
        }
    }
}

impl ProbeConfig {
    /// Load a config file; `.yaml`/`.yml` parse as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config = if matches!(ext, "yaml" | "yml") {
            serde_yaml::from_str(&body).context("Failed to parse config YAML")?
        } else {
            serde_json::from_str(&body).context("Failed to parse config JSON")?
        };
        Ok(config)
    }

    /// Load `path` when given, otherwise defaults; env tool overrides always apply.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.tools = config.tools.with_env_overrides();
        Ok(config)
    }

    /// Component-wise prefix check on resolved paths, so `..` and symlinks
    /// cannot move a bundle into (or a root over) trusted territory. Paths
    /// that do not exist are compared as written.
    pub fn is_trusted(&self, path: &Path) -> bool {
        let path = resolved(path);
        self.trusted_roots.iter().any(|root| path.starts_with(resolved(root)))
    }
}
