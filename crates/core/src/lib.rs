//! probe-core
//!
//! Core library for discovering framework bundles on a host, identifying the
//! executable payload inside each one, and running the staged analysis
//! pipeline (static inspection, usage correlation, load probing, reporting).
//!
//! External analysis tools (radare2, rabin2, otool, nm, plutil, class-dump)
//! are driven through the [`tools::ToolRunner`] seam so every stage can be
//! tested without them installed.

pub mod config;
pub mod db;
pub mod diagnostics;
pub mod model;
pub mod report;
pub mod services;
pub mod tools;
pub mod util;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
