pub mod csv;
pub mod html;
pub mod json;

use std::path::Path;

use crate::error::ExportError;
use crate::report::issue::Issue;

/// Supported output formats
pub const FORMATS: &[&str] = &["csv", "json", "html"];

/// A merged report exporter.
/// Writes a list of issues to a file, restricted to a field projection.
pub trait Exporter: Send + Sync {
    /// Output format, also used as the file extension
    fn format(&self) -> &str;

    /// Write `issues` to `destination`, keeping only `fields`
    fn export(&self, issues: &[Issue], destination: &Path, fields: &[&str]) -> Result<(), ExportError>;
}

/// Registry of all exporters
pub fn all_exporters(logo: Option<String>) -> Vec<Box<dyn Exporter>> {
    vec![
        Box::new(csv::CsvExporter),
        Box::new(json::JsonExporter),
        Box::new(html::HtmlExporter::new(logo)),
    ]
}

/// Exporters for a comma-separated list of formats, in the given order.
/// Unknown formats are returned separately.
pub fn exporters_by_formats(formats: &str, logo: Option<String>) -> (Vec<Box<dyn Exporter>>, Vec<String>) {
    let mut available = all_exporters(logo);
    let mut selected = Vec::new();
    let mut unknown = Vec::new();
    for format in formats.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match available.iter().position(|e| e.format().eq_ignore_ascii_case(format)) {
            Some(pos) => selected.push(available.remove(pos)),
            None => {
                if !selected.iter().any(|e| e.format().eq_ignore_ascii_case(format)) {
                    unknown.push(format.to_string());
                }
            }
        }
    }
    (selected, unknown)
}

/// Create the destination file
pub(crate) fn create_file(destination: &Path) -> Result<std::fs::File, ExportError> {
    std::fs::File::create(destination).map_err(|source| ExportError::Io {
        path: destination.to_path_buf(),
        source,
    })
}
