//! Report persistence (layer 4).
//!
//! The pipeline only needs [`ReportSink`]; [`FileReportWriter`] is the
//! on-disk implementation producing a lossless JSON record, a Markdown
//! summary, and a run-index row per analysed bundle.

mod markdown;
mod writer;

use std::path::PathBuf;

use thiserror::Error;

use crate::model::AnalysisRecord;

pub use markdown::{render_summary, summary_value};
pub use writer::FileReportWriter;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("run index error: {0}")]
    Index(#[from] crate::db::DbError),
}

/// Where a record ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub data: PathBuf,
    pub summary: PathBuf,
}

pub trait ReportSink: Send + Sync {
    fn persist(&self, record: &AnalysisRecord) -> Result<ReportPaths, ReportError>;
}
