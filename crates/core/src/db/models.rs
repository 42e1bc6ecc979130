use serde::{Deserialize, Serialize};

use crate::model::{AnalysisRecord, LoadStatus};

/// One row of the run index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    pub component: String,
    pub bundle_path: String,
    pub payload_path: String,
    /// SHA-256 of the payload, when it could be read.
    pub payload_hash: Option<String>,
    pub class_count: i64,
    pub used_by_count: i64,
    pub is_swift: bool,
    pub load_status: String,
    /// Path to the JSON report, relative to the output root if possible.
    pub report_path: String,
    pub analyzed_at: String,
}

impl RunRecord {
    pub fn from_record(
        record: &AnalysisRecord,
        payload_hash: Option<String>,
        report_path: String,
    ) -> Self {
        Self {
            component: record.name.clone(),
            bundle_path: record.bundle_path.display().to_string(),
            payload_path: record.binary_path.display().to_string(),
            payload_hash,
            class_count: record.static_facts.classes.value.len() as i64,
            used_by_count: record.usage.len() as i64,
            is_swift: record.static_facts.swift_metadata.value.is_swift,
            load_status: record.runtime.load.status.as_str().to_string(),
            report_path,
            analyzed_at: record.analyzed_at.clone(),
        }
    }

    pub fn loaded(&self) -> bool {
        self.load_status == LoadStatus::Loaded.as_str()
    }
}
