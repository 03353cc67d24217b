use std::path::Path;

use crate::error::ExportError;
use crate::exporters::{create_file, Exporter};
use crate::report::issue::Issue;

/// Export the merged report to a CSV file: a header row with the field
/// names, then one row per issue.
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> &str {
        "csv"
    }

    fn export(&self, issues: &[Issue], destination: &Path, fields: &[&str]) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_writer(create_file(destination)?);
        writer.write_record(fields)?;
        for issue in issues {
            writer.write_record(issue.flatten().project(fields))?;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
