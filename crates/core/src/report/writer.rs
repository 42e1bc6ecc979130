use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::db::{OutputLayout, RunIndex, RunRecord};
use crate::model::AnalysisRecord;
use crate::report::{render_summary, ReportError, ReportPaths, ReportSink};
use crate::util::sha256_file;

fn write_file(path: &Path, body: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| ReportError::Io { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, body).map_err(|source| ReportError::Io { path: path.to_path_buf(), source })
}

/// Writes `data/<Name>.json`, `content/docs/<Name>.md` and an index row.
pub struct FileReportWriter {
    layout: OutputLayout,
    index: Mutex<RunIndex>,
}

impl FileReportWriter {
    /// Create the output directories and open the run index.
    pub fn create(layout: OutputLayout) -> Result<Self, ReportError> {
        for dir in [&layout.data_dir, &layout.docs_dir, &layout.meta_dir] {
            fs::create_dir_all(dir)
                .map_err(|source| ReportError::Io { path: dir.clone(), source })?;
        }
        let index = RunIndex::open(&layout.index_path)?;
        Ok(Self { layout, index: Mutex::new(index) })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }
}

impl ReportSink for FileReportWriter {
    fn persist(&self, record: &AnalysisRecord) -> Result<ReportPaths, ReportError> {
        let data = self.layout.data_path(&record.name);
        write_file(&data, &serde_json::to_string_pretty(record)?)?;

        let summary = self.layout.doc_path(&record.name);
        write_file(&summary, &render_summary(record)?)?;

        let hash = sha256_file(&record.binary_path).ok();
        let row = RunRecord::from_record(record, hash, self.layout.relative_string(&data));
        if let Ok(index) = self.index.lock() {
            index.insert_run(&row)?;
        }

        Ok(ReportPaths { data, summary })
    }
}
