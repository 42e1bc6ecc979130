//! Injected diagnostics channel.
//!
//! Components receive a [`SharedDiagnostics`] at construction instead of
//! logging through a global, so tests can run silently or inspect exactly
//! what a stage reported.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Diagnostics: Send + Sync {
    fn emit(&self, severity: Severity, component: &'static str, message: &str);

    fn debug(&self, component: &'static str, message: &str) {
        self.emit(Severity::Debug, component, message);
    }

    fn info(&self, component: &'static str, message: &str) {
        self.emit(Severity::Info, component, message);
    }

    fn warn(&self, component: &'static str, message: &str) {
        self.emit(Severity::Warn, component, message);
    }

    fn error(&self, component: &'static str, message: &str) {
        self.emit(Severity::Error, component, message);
    }
}

pub type SharedDiagnostics = Arc<dyn Diagnostics>;

/// Forwards to `tracing`; the frontend owns the subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, severity: Severity, component: &'static str, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(component, "{message}"),
            Severity::Info => tracing::info!(component, "{message}"),
            Severity::Warn => tracing::warn!(component, "{message}"),
            Severity::Error => tracing::error!(component, "{message}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentDiagnostics;

impl Diagnostics for SilentDiagnostics {
    fn emit(&self, _severity: Severity, _component: &'static str, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub severity: Severity,
    pub component: &'static str,
    pub message: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events at or above `severity` whose message contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.events().iter().any(|e| e.severity >= severity && e.message.contains(needle))
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn emit(&self, severity: Severity, component: &'static str, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(DiagnosticEvent { severity, component, message: message.to_string() });
        }
    }
}

pub fn tracing_diagnostics() -> SharedDiagnostics {
    Arc::new(TracingDiagnostics)
}

pub fn silent() -> SharedDiagnostics {
    Arc::new(SilentDiagnostics)
}
