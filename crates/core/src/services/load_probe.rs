//! Layer 3: does the payload load at all?
//!
//! The payload is never loaded in this process. A disposable child (by
//! default this executable's hidden `load-helper` subcommand) attempts a lazy
//! `dlopen` and prints one sentinel token; the parent classifies how the
//! child finished. A child killed by a load-time initializer is the thing
//! being measured, not a failure of the probe.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LoaderCommand, ProbeConfig};
use crate::diagnostics::SharedDiagnostics;
use crate::model::{Bundle, HeaderDump, LoadOutcome, LoadStatus, Payload, Probed, RuntimeFacts};
use crate::services::identify::BinaryIdentifier;
use crate::tools::{run_text, tool_available, ToolError, ToolInvocation, ToolRunner};
use crate::util::truncate_chars;

const COMPONENT: &str = "runtime";

pub const LOADED_SENTINEL: &str = "loaded";
pub const LOAD_FAILED_SENTINEL: &str = "load_failed";

/// Result of the in-child load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadAttempt {
    Loaded,
    LoadFailed(String),
    Error(String),
}

impl LoadAttempt {
    /// The single line the child prints.
    pub fn sentinel(&self) -> String {
        match self {
            LoadAttempt::Loaded => LOADED_SENTINEL.to_string(),
            LoadAttempt::LoadFailed(_) => LOAD_FAILED_SENTINEL.to_string(),
            LoadAttempt::Error(msg) => format!("error: {msg}"),
        }
    }
}

/// Child-side load. Only ever call this from a process that can afford to die.
#[cfg(unix)]
pub fn attempt_load(path: &Path) -> LoadAttempt {
    use std::ffi::{CStr, CString};
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return LoadAttempt::Error("path contains an interior NUL byte".to_string());
    };
    // SAFETY: c_path is NUL-terminated; the handle is intentionally leaked
    // because the process exits right after reporting.
    let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY) };
    if handle.is_null() {
        let reason = unsafe {
            let err = libc::dlerror();
            if err.is_null() {
                String::new()
            } else {
                CStr::from_ptr(err).to_string_lossy().to_string()
            }
        };
        LoadAttempt::LoadFailed(reason)
    } else {
        LoadAttempt::Loaded
    }
}

#[cfg(not(unix))]
pub fn attempt_load(_path: &Path) -> LoadAttempt {
    LoadAttempt::Error("unsupported platform".to_string())
}

/// Map a finished (or failed) child run onto the outcome vocabulary.
pub fn classify(result: Result<crate::tools::ToolOutput, ToolError>) -> LoadOutcome {
    let output = match result {
        Ok(output) => output,
        Err(ToolError::TimedOut { timeout, .. }) => {
            return LoadOutcome::with_diagnostic(
                LoadStatus::TimedOut,
                format!("load did not finish within {}ms", timeout.as_millis()),
            )
        }
        Err(e) => return LoadOutcome::with_diagnostic(LoadStatus::Error, e.to_string()),
    };

    if !output.success() {
        return LoadOutcome::with_diagnostic(
            LoadStatus::Crashed,
            format!(
                "loader exited with {} (likely a +load assertion or crash in a static initializer)",
                output.status_description()
            ),
        );
    }
    match output.stdout.trim() {
        LOADED_SENTINEL => LoadOutcome::new(LoadStatus::Loaded),
        LOAD_FAILED_SENTINEL => LoadOutcome::new(LoadStatus::LoadFailed),
        other => LoadOutcome::with_diagnostic(LoadStatus::Error, other.to_string()),
    }
}

pub struct LoadProbe {
    config: ProbeConfig,
    loader: LoaderCommand,
    identifier: BinaryIdentifier,
    runner: Arc<dyn ToolRunner>,
    diagnostics: SharedDiagnostics,
}

impl LoadProbe {
    pub fn new(
        config: ProbeConfig,
        loader: LoaderCommand,
        runner: Arc<dyn ToolRunner>,
        diagnostics: SharedDiagnostics,
    ) -> Self {
        Self { config, loader, identifier: BinaryIdentifier::new(), runner, diagnostics }
    }

    pub fn with_identifier(mut self, identifier: BinaryIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    fn timeout(&self) -> Duration {
        self.config.timeouts.load_probe()
    }

    /// Exactly one outcome per bundle, identifying the payload itself.
    pub fn probe(&self, bundle: &Bundle) -> LoadOutcome {
        let payload = self.identifier.identify(bundle);
        self.probe_payload(bundle, payload.as_ref())
    }

    /// Load `payload`, already chosen for `bundle` by the caller.
    pub fn probe_payload(&self, bundle: &Bundle, payload: Option<&Payload>) -> LoadOutcome {
        if !self.config.is_trusted(&bundle.root) {
            return LoadOutcome::new(LoadStatus::SkippedUnsafe);
        }
        let Some(payload) = payload else {
            return LoadOutcome::new(LoadStatus::SkippedNoBinary);
        };

        let invocation = ToolInvocation::new(&self.loader.program)
            .args(&self.loader.args)
            .arg(payload.path())
            .timeout(self.timeout());
        let outcome = classify(self.runner.run(&invocation));
        if outcome.status == LoadStatus::Error {
            let detail = outcome.diagnostic.as_deref().unwrap_or_default();
            self.diagnostics.warn(COMPONENT, &format!("Runtime analysis failed: {detail}"));
        }
        outcome
    }

    /// Header recovery via class-dump, when installed.
    pub fn recover_headers(&self, bundle: &Bundle) -> Option<Probed<Option<HeaderDump>>> {
        let class_dump = &self.config.tools.class_dump;
        if tool_available(&*self.runner, class_dump, "--version").is_err() {
            return None;
        }
        let inv = ToolInvocation::new(class_dump)
            .arg(&bundle.root)
            .timeout(self.config.timeouts.header_dump());
        Some(match run_text(&*self.runner, &inv) {
            Ok(dump) => Probed::ok(Some(HeaderDump {
                tool: "class-dump".to_string(),
                dump_size: dump.len(),
                preview: truncate_chars(&dump, self.config.header_preview_chars),
            })),
            Err(e) => {
                self.diagnostics.warn(COMPONENT, &format!("class-dump failed: {e}"));
                Probed::degraded(e.to_string())
            }
        })
    }

    pub fn analyze(&self, bundle: &Bundle) -> RuntimeFacts {
        let payload = self.identifier.identify(bundle);
        self.analyze_payload(bundle, payload.as_ref())
    }

    pub fn analyze_payload(&self, bundle: &Bundle, payload: Option<&Payload>) -> RuntimeFacts {
        self.diagnostics
            .info(COMPONENT, &format!("[Layer 3] Analyzing runtime for {}...", bundle.name));
        let headers = self.recover_headers(bundle);
        RuntimeFacts { load: self.probe_payload(bundle, payload), headers }
    }
}
