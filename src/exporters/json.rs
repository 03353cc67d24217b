use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::error::ExportError;
use crate::exporters::{create_file, Exporter};
use crate::report::issue::Issue;

/// Export the merged report to a JSON file: an array of flat objects
/// restricted to the selected fields.
pub struct JsonExporter;

/// Render issues as a pretty-printed JSON array
pub fn render(issues: &[Issue], fields: &[&str]) -> Result<String, ExportError> {
    let array: Vec<Value> = issues
        .iter()
        .map(|issue| Value::Object(issue.flatten().to_json(fields)))
        .collect();
    Ok(serde_json::to_string_pretty(&array)?)
}

impl Exporter for JsonExporter {
    fn format(&self) -> &str {
        "json"
    }

    fn export(&self, issues: &[Issue], destination: &Path, fields: &[&str]) -> Result<(), ExportError> {
        let output = render(issues, fields)?;
        let mut file = create_file(destination)?;
        file.write_all(output.as_bytes())
            .map_err(|source| ExportError::Io {
                path: destination.to_path_buf(),
                source,
            })
    }
}
