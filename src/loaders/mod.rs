pub mod dependency_check;
pub mod npm_audit;
pub mod reportmix;
pub mod sonarqube;

use std::path::Path;

use chrono::NaiveDateTime;

use crate::config::ReportMixConfig;
use crate::error::LoadError;
use crate::report::issue::Issue;

/// Names of the available sources, in default merge order
pub const SOURCE_NAMES: &[&str] = &["dependency_check", "npm_audit", "sonarqube", "reportmix"];

/// A report loader.
/// Each loader reads one kind of report and maps its findings to issues.
///
/// Missing or broken sources are expected: loaders log them and return an
/// empty list so other sources can still be merged. Only an `Err` is
/// reported back to the mixer.
pub trait Loader: Send + Sync {
    /// Source name (e.g. "npm_audit")
    fn name(&self) -> &str;

    /// Short description of the loaded report
    fn description(&self) -> &str;

    /// Load the report and map it to issues
    fn load(&self) -> Result<Vec<Issue>, LoadError>;
}

/// Registry of all loaders, in default merge order
pub fn all_loaders(config: &ReportMixConfig) -> Vec<Box<dyn Loader>> {
    vec![
        Box::new(dependency_check::DependencyCheckLoader::new(
            config.dependency_check.clone(),
        )),
        Box::new(npm_audit::NpmAuditLoader::new(config.npm_audit.clone())),
        Box::new(sonarqube::SonarQubeLoader::new(config.sonarqube.clone())),
        Box::new(reportmix::ReportMixLoader::new(config.reportmix.clone())),
    ]
}

/// Loaders selected by name, in the order the names are given
pub fn loaders_by_names<S: AsRef<str>>(config: &ReportMixConfig, names: &[S]) -> Vec<Box<dyn Loader>> {
    let mut available = all_loaders(config);
    let mut selected = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if let Some(pos) = available.iter().position(|l| l.name().eq_ignore_ascii_case(name)) {
            selected.push(available.remove(pos));
        }
    }
    selected
}

/// True when `path` exists and has the given extension
pub(crate) fn is_report_file(path: &Path, extension: &str) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Parse the leading `%Y-%m-%dT%H:%M:%S` part of an ISO timestamp,
/// ignoring fractional seconds and timezone
pub(crate) fn parse_iso_prefix(value: &str) -> Option<NaiveDateTime> {
    let prefix = value.get(..19)?;
    NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order() {
        let config = ReportMixConfig::default();
        let names: Vec<_> = all_loaders(&config).iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, SOURCE_NAMES);
    }

    #[test]
    fn test_loaders_by_names() {
        let config = ReportMixConfig::default();
        let loaders = loaders_by_names(&config, &["reportmix", " NPM_AUDIT", "unknown", "reportmix"]);
        let names: Vec<_> = loaders.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["reportmix", "npm_audit"]);
    }

    #[test]
    fn test_is_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("report.CSV");
        std::fs::write(&csv, "a,b\n").unwrap();
        assert!(is_report_file(&csv, "csv"));
        assert!(!is_report_file(&csv, "json"));
        assert!(!is_report_file(&dir.path().join("missing.csv"), "csv"));
        assert!(!is_report_file(dir.path(), "csv"));
    }

    #[test]
    fn test_parse_iso_prefix() {
        let date = parse_iso_prefix("2019-07-10T12:34:56+0200").unwrap();
        assert_eq!(date.to_string(), "2019-07-10 12:34:56");
        assert!(parse_iso_prefix("2019-07-10").is_none());
        assert!(parse_iso_prefix("not a date at all!!!").is_none());
    }
}
