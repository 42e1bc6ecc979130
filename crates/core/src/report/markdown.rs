use serde_json::{json, Value};

use crate::model::AnalysisRecord;

/// Compact summary embedded in the Markdown page; large fields stay in the JSON.
pub fn summary_value(record: &AnalysisRecord) -> Value {
    json!({
        "binary_path": record.binary_path,
        "static": {
            "classes_count": record.static_facts.classes.value.len(),
            "swift_enabled": record.static_facts.swift_metadata.value.is_swift,
        },
        "usage": {
            "used_by_count": record.usage.len(),
        },
        "runtime": record.runtime,
    })
}

pub fn render_summary(record: &AnalysisRecord) -> Result<String, serde_json::Error> {
    let name = &record.name;
    let mut md = Vec::new();
    md.push(format!("---\ntitle: {name}\nweight: 1\n---\n"));
    md.push("## Raw Data\n".to_string());
    md.push(format!(
        "Full analysis data is available in [`data/{name}.json`](../../data/{name}.json).\n"
    ));
    md.push("## Summary\n".to_string());
    md.push("```json".to_string());
    md.push(serde_json::to_string_pretty(&summary_value(record))?);
    md.push("```\n".to_string());
    Ok(md.join("\n"))
}
