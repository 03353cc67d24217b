use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::ReportMixSourceConfig;
use crate::error::LoadError;
use crate::loaders::{is_report_file, Loader};
use crate::report::issue::{Issue, Project, Subject, Tool, DATE_FORMAT};
use crate::report::severity::Severity;

/// Columns that must be present in every row
const REQUIRED: &[&str] = &["identifier", "tool_identifier", "subject_identifier"];

/// ReportMix report loader: reads back a CSV report written by ReportMix.
///
/// Unlike the other loaders, any failure is returned to the mixer: this
/// source is only used when explicitly configured.
pub struct ReportMixLoader {
    config: ReportMixSourceConfig,
}

impl ReportMixLoader {
    pub fn new(config: ReportMixSourceConfig) -> Self {
        ReportMixLoader { config }
    }

    fn read(&self, path: &Path) -> Result<Vec<Issue>, LoadError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut issues = Vec::new();
        for (index, record) in reader.deserialize::<HashMap<String, String>>().enumerate() {
            let row = Row(record?);
            issues.push(row.to_issue().map_err(|e| {
                LoadError::Invalid(format!("row {}: {}", index + 1, e))
            })?);
        }
        Ok(issues)
    }
}

/// A CSV row keyed by column name
struct Row(HashMap<String, String>);

impl Row {
    /// Optional column, empty when missing
    fn text(&self, name: &str) -> String {
        self.0.get(name).cloned().unwrap_or_default()
    }

    fn date(&self, name: &str) -> Result<Option<NaiveDateTime>, String> {
        match self.0.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(None),
            Some(value) => parse_date(value)
                .map(Some)
                .ok_or_else(|| format!("invalid {} '{}'", name, value)),
        }
    }

    fn to_issue(&self) -> Result<Issue, String> {
        if let Some(missing) = REQUIRED.iter().find(|c| !self.0.contains_key(**c)) {
            return Err(format!("missing required column '{}'", missing));
        }

        let severity = self.text("severity");
        let severity = Severity::from_identifier(&severity).unwrap_or_else(|| {
            debug!("Unknown severity '{}'", severity);
            Severity::NotDefined
        });
        let evidences = self
            .0
            .get("evidences")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1);

        // meta_* and hash are recomputed by the mixer
        Ok(Issue {
            reference: self.text("ref"),
            identifier: self.text("identifier"),
            name: self.text("name"),
            issue_type: self.text("type"),
            category: self.text("category"),
            description: self.text("description"),
            more: self.text("more"),
            action: self.text("action"),
            effort: self.text("effort"),
            analysis_date: self.date("analysis_date")?,
            severity,
            score: self.text("score"),
            confidence: self.text("confidence"),
            evidences,
            source: self.text("source"),
            source_date: self.date("source_date")?,
            url: self.text("url"),
            tool: Tool {
                identifier: self.text("tool_identifier"),
                name: self.text("tool_name"),
                version: self.text("tool_version"),
            },
            subject: Subject {
                identifier: self.text("subject_identifier"),
                name: self.text("subject_name"),
                description: self.text("subject_description"),
                version: self.text("subject_version"),
                location: self.text("subject_location"),
                license: self.text("subject_license"),
            },
            project: Project {
                identifier: self.text("project_identifier"),
                name: self.text("project_name"),
                version: self.text("project_version"),
            },
            meta: None,
            hash: None,
        })
    }
}

/// Accepts "2020-01-02 03:04:05" and ISO "2020-01-02T03:04:05.123"
fn parse_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, &format!("{}%.f", DATE_FORMAT))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

impl Loader for ReportMixLoader {
    fn name(&self) -> &str {
        "reportmix"
    }

    fn description(&self) -> &str {
        "CSV report previously exported by ReportMix"
    }

    fn load(&self) -> Result<Vec<Issue>, LoadError> {
        let path = self
            .config
            .report_file
            .as_ref()
            .ok_or(LoadError::MissingReportFile)?;
        if !is_report_file(path, "csv") {
            return Err(LoadError::NotFound {
                path: path.clone(),
                extension: "csv",
            });
        }

        debug!("Loading report {}", path.display());
        self.read(path)
    }
}
