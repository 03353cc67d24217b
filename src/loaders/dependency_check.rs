use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::DependencyCheckConfig;
use crate::error::LoadError;
use crate::loaders::{is_report_file, Loader};
use crate::report::issue::{Issue, Project, Subject, Tool};
use crate::report::severity::Severity;

/// One vulnerability row of the Dependency-Check CSV report
#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Project")]
    project: String,
    #[serde(rename = "ScanDate")]
    scan_date: String,
    #[serde(rename = "DependencyName")]
    dependency_name: String,
    #[serde(rename = "DependencyPath")]
    dependency_path: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "License")]
    license: String,
    #[serde(rename = "Identifiers")]
    identifiers: String,
    #[serde(rename = "CPE Confidence")]
    cpe_confidence: String,
    #[serde(rename = "CVE")]
    cve: String,
    #[serde(rename = "CWE")]
    cwe: String,
    #[serde(rename = "Vulnerability")]
    vulnerability: String,
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "CVSSv3_BaseSeverity")]
    cvss_v3_severity: String,
    #[serde(rename = "CVSSv3")]
    cvss_v3: String,
    #[serde(rename = "Evidence Count")]
    evidence_count: u32,
}

/// The parts of the JSON report used to complete the CSV report
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    scan_info: ScanInfo,
    project_info: ProjectInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanInfo {
    #[serde(default)]
    engine_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectInfo {
    #[serde(rename = "groupID", default)]
    group_id: Option<String>,
    #[serde(rename = "artifactID", default)]
    artifact_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// OWASP Dependency-Check report loader (CSV required, JSON optional).
pub struct DependencyCheckLoader {
    config: DependencyCheckConfig,
}

impl DependencyCheckLoader {
    pub fn new(config: DependencyCheckConfig) -> Self {
        DependencyCheckLoader { config }
    }

    fn read(&self, path: &Path) -> Result<Vec<Issue>, LoadError> {
        let sidecar = read_sidecar(&path.with_extension("json"))?;
        let tool_version = sidecar.scan_info.engine_version.unwrap_or_default();
        let project_info = sidecar.project_info;

        let mut reader = csv::Reader::from_path(path)?;
        let mut issues = Vec::new();
        for row in reader.deserialize::<Row>() {
            let row = row?;
            let project_identifier = match (&project_info.group_id, &project_info.artifact_id) {
                (Some(group), Some(artifact)) => format!("{}:{}", group, artifact),
                _ => row.project.clone(),
            };
            let severity = Severity::classify(&row.cvss_v3_severity).unwrap_or_else(|| {
                debug!("Unknown severity '{}' for {}", row.cvss_v3_severity, row.cve);
                Severity::NotDefined
            });

            issues.push(Issue {
                identifier: row.cve.clone(),
                name: row.cve,
                issue_type: "VULNERABILITY".to_string(),
                category: row.cwe,
                description: row.vulnerability,
                analysis_date: parse_scan_date(&row.scan_date),
                severity,
                score: row.cvss_v3,
                confidence: row.cpe_confidence,
                evidences: row.evidence_count,
                source: row.source,
                tool: Tool::new("dependency_check", "Dependency-Check", &tool_version),
                subject: Subject {
                    identifier: row.identifiers,
                    name: row.description,
                    description: row.dependency_name,
                    version: String::new(),
                    location: row.dependency_path,
                    license: row.license,
                },
                project: Project {
                    identifier: project_identifier,
                    name: row.project,
                    version: project_info.version.clone().unwrap_or_default(),
                },
                ..Issue::default()
            });
        }
        Ok(issues)
    }
}

/// Read the JSON report next to the CSV one. Its absence is not an error.
fn read_sidecar(path: &Path) -> Result<Sidecar, LoadError> {
    if !path.is_file() {
        debug!("No JSON report at {}", path.display());
        return Ok(Sidecar::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse dates like "Tue, 9 Jul 2019 10:11:12 +0200" (timezone ignored)
fn parse_scan_date(value: &str) -> Option<NaiveDateTime> {
    let without_zone: Vec<&str> = value.split_whitespace().take(5).collect();
    let date = NaiveDateTime::parse_from_str(&without_zone.join(" "), "%a, %d %b %Y %H:%M:%S");
    if date.is_err() && !value.trim().is_empty() {
        debug!("Unparseable scan date '{}'", value);
    }
    date.ok()
}

impl Loader for DependencyCheckLoader {
    fn name(&self) -> &str {
        "dependency_check"
    }

    fn description(&self) -> &str {
        "OWASP Dependency-Check CSV report (with optional JSON report alongside)"
    }

    fn load(&self) -> Result<Vec<Issue>, LoadError> {
        let path = &self.config.report_file;
        if !is_report_file(path, "csv") {
            warn!(
                "Dependency-Check report ignored (file not found or not *.csv): {}",
                path.display()
            );
            return Ok(Vec::new());
        }

        debug!("Loading report {}", path.display());
        match self.read(path) {
            Ok(issues) => Ok(issues),
            Err(e) => {
                error!("Failed to load, parse and map the Dependency-Check report ({})", e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const HEADER: &str = "Project,ScanDate,DependencyName,DependencyPath,Description,License,Md5,Sha1,Identifiers,CPE,CVE,CWE,Vulnerability,Source,CVSSv2_Severity,CVSSv2_Score,CVSSv3_BaseSeverity,CVSSv3_BaseScore,CVSSv3,CPE Confidence,Evidence Count";

    fn write_report(dir: &Path) -> PathBuf {
        let path = dir.join("dependency-check-report.csv");
        let content = format!(
            "{}\n{}\n{}\n",
            HEADER,
            r#"webapp,"Tue, 9 Jul 2019 10:11:12 +0200",lodash:4.17.11,/app/node_modules/lodash/package.json,Lodash modular utilities.,MIT,abc,def,pkg:npm/lodash@4.17.11,,CVE-2019-10744,CWE-20,"Prototype pollution, in defaultsDeep",NVD,MEDIUM,6.4,CRITICAL,9.1,9.1,HIGHEST,3"#,
            r#"webapp,"Tue, 9 Jul 2019 10:11:12 +0200",jquery:3.3.1,/app/static/jquery.js,jQuery,MIT,abc,def,pkg:javascript/jquery@3.3.1,,CVE-2019-11358,CWE-79,XSS,OSSINDEX,MEDIUM,4.3,Moderate,6.1,6.1,HIGH,2"#,
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    fn loader(path: PathBuf) -> DependencyCheckLoader {
        DependencyCheckLoader::new(DependencyCheckConfig { report_file: path })
    }

    #[test]
    fn test_load_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let issues = loader(write_report(dir.path())).load().unwrap();

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.issue_type == "VULNERABILITY"));
        assert!(issues.iter().all(|i| i.tool.identifier == "dependency_check"));
        assert!(issues.iter().all(|i| i.tool.version.is_empty()));
        assert!(issues.iter().all(|i| i.project.identifier == "webapp"));

        let first = &issues[0];
        assert_eq!(first.identifier, "CVE-2019-10744");
        assert_eq!(first.description, "Prototype pollution, in defaultsDeep");
        assert_eq!(first.severity, Severity::Critical);
        assert_eq!(first.evidences, 3);
        assert_eq!(first.category, "CWE-20");
        assert_eq!(first.subject.identifier, "pkg:npm/lodash@4.17.11");
        assert_eq!(first.subject.location, "/app/node_modules/lodash/package.json");
        assert_eq!(first.analysis_date.map(|d| d.to_string()), Some("2019-07-09 10:11:12".to_string()));

        assert_eq!(issues[1].severity, Severity::Medium);
    }

    #[test]
    fn test_load_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path());
        std::fs::write(
            path.with_extension("json"),
            r#"{"reportSchema":"1.1","scanInfo":{"engineVersion":"5.2.1"},"projectInfo":{"name":"webapp","groupID":"org.example","artifactID":"webapp","version":"1.2.0"},"dependencies":[]}"#,
        )
        .unwrap();

        let issues = loader(path).load().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].tool.version, "5.2.1");
        assert_eq!(issues[0].project.identifier, "org.example:webapp");
        assert_eq!(issues[0].project.name, "webapp");
        assert_eq!(issues[0].project.version, "1.2.0");
    }

    #[test]
    fn test_missing_or_wrong_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(loader(dir.path().join("missing.csv")).load().unwrap().is_empty());

        let txt = dir.path().join("report.txt");
        std::fs::write(&txt, HEADER).unwrap();
        assert!(loader(txt).load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_report_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "Project,CVE\nwebapp,CVE-1\n").unwrap();
        assert!(loader(path).load().unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_sidecar_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path());

        std::fs::write(path.with_extension("json"), r#"{"scanInfo": "#).unwrap();
        assert_eq!(loader(path.clone()).load().unwrap(), vec![]);

        std::fs::write(
            path.with_extension("json"),
            r#"{"projectInfo":{"name":"webapp"},"dependencies":[]}"#,
        )
        .unwrap();
        assert_eq!(loader(path).load().unwrap(), vec![]);
    }

    #[test]
    fn test_parse_scan_date() {
        assert!(parse_scan_date("Tue, 09 Jul 2019 10:11:12 +0200").is_some());
        assert!(parse_scan_date("yesterday").is_none());
        assert!(parse_scan_date("").is_none());
    }
}
