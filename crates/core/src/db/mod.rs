//! Output layout and the SQLite run index.
//!
//! Every persisted [`crate::model::AnalysisRecord`] gets one row in the run
//! index so earlier runs can be listed without re-reading the JSON reports.

mod layout;
mod models;
mod run_index;

pub use layout::OutputLayout;
pub use models::RunRecord;
pub use run_index::{DbError, DbResult, RunIndex, CURRENT_SCHEMA_VERSION};
