use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::NpmAuditConfig;
use crate::error::LoadError;
use crate::loaders::{is_report_file, Loader};
use crate::report::issue::{Issue, Project, Subject, Tool};
use crate::report::severity::Severity;

#[derive(Debug, Deserialize)]
struct AuditReport {
    /// Advisories keyed by advisory number, in file order
    advisories: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Advisory {
    #[serde(default)]
    id: Option<Value>,
    title: String,
    module_name: String,
    #[serde(default)]
    cves: Vec<String>,
    #[serde(default)]
    vulnerable_versions: String,
    #[serde(default)]
    patched_versions: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    recommendation: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    cwe: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    findings: Vec<Finding>,
}

#[derive(Debug, Deserialize)]
struct Finding {
    #[serde(default)]
    paths: Vec<String>,
}

/// npm security audit report loader (`npm audit --json`).
pub struct NpmAuditLoader {
    config: NpmAuditConfig,
}

impl NpmAuditLoader {
    pub fn new(config: NpmAuditConfig) -> Self {
        NpmAuditLoader { config }
    }

    fn read(&self, path: &Path) -> Result<Vec<Issue>, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report: AuditReport = serde_json::from_str(&content)?;

        let mut issues = Vec::new();
        for (number, value) in report.advisories {
            let advisory: Advisory = serde_json::from_value(value)?;
            issues.extend(map_advisory(&number, &advisory));
        }
        Ok(issues)
    }
}

/// One issue per finding (install path) of the advisory
fn map_advisory(number: &str, advisory: &Advisory) -> Vec<Issue> {
    let reference = match &advisory.id {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => number.to_string(),
    };
    let identifier = if advisory.cves.is_empty() {
        advisory.title.clone()
    } else {
        advisory.cves.join(", ")
    };
    let severity = Severity::classify(&advisory.severity).unwrap_or_else(|| {
        debug!("Unknown severity '{}' for advisory {}", advisory.severity, number);
        Severity::NotDefined
    });
    let source_date = advisory
        .created
        .as_deref()
        .and_then(|d| NaiveDateTime::parse_from_str(d, "%Y-%m-%dT%H:%M:%S%.fZ").ok());

    advisory
        .findings
        .iter()
        .map(|finding| Issue {
            reference: reference.clone(),
            identifier: identifier.clone(),
            name: advisory.title.clone(),
            issue_type: "VULNERABILITY".to_string(),
            category: advisory.cwe.clone(),
            description: advisory.overview.trim().to_string(),
            action: advisory.recommendation.trim().to_string(),
            severity,
            evidences: advisory.findings.len() as u32,
            source: "NPM Public Advisories".to_string(),
            source_date,
            url: advisory.url.clone(),
            tool: Tool::new("npm_audit", "npm audit", ""),
            subject: Subject {
                identifier: advisory.module_name.clone(),
                name: advisory.module_name.clone(),
                version: format!(
                    "Vulnerable versions: {}, Patched versions: {}",
                    advisory.vulnerable_versions, advisory.patched_versions
                ),
                location: finding.paths.first().cloned().unwrap_or_default(),
                ..Subject::default()
            },
            project: Project::default(),
            ..Issue::default()
        })
        .collect()
}

impl Loader for NpmAuditLoader {
    fn name(&self) -> &str {
        "npm_audit"
    }

    fn description(&self) -> &str {
        "npm audit JSON report (one issue per advisory finding)"
    }

    fn load(&self) -> Result<Vec<Issue>, LoadError> {
        let path = &self.config.report_file;
        if !is_report_file(path, "json") {
            warn!(
                "npm audit report ignored (file not found or not *.json): {}",
                path.display()
            );
            return Ok(Vec::new());
        }

        debug!("Loading report {}", path.display());
        match self.read(path) {
            Ok(issues) => Ok(issues),
            Err(e) => {
                error!("Failed to load, parse and map the npm audit report ({})", e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const REPORT: &str = r#"{
  "actions": [],
  "advisories": {
    "1065": {
      "findings": [
        {"version": "4.17.11", "paths": ["lodash", "webpack>lodash"]},
        {"version": "4.17.10", "paths": ["async>lodash"]}
      ],
      "id": 1065,
      "created": "2019-07-02T21:05:36.000Z",
      "title": "Prototype Pollution",
      "module_name": "lodash",
      "cves": ["CVE-2019-10744"],
      "vulnerable_versions": "<4.17.12",
      "patched_versions": ">=4.17.12",
      "overview": "  Versions of lodash before 4.17.12 are vulnerable to Prototype Pollution.\n",
      "recommendation": "Update to version 4.17.12 or later.\n",
      "severity": "high",
      "cwe": "CWE-471",
      "url": "https://npmjs.com/advisories/1065"
    },
    "786": {
      "findings": [{"version": "1.0.0", "paths": []}],
      "id": null,
      "created": "2019-02-18T16:00:00.000Z",
      "title": "Regular Expression Denial of Service",
      "module_name": "braces",
      "cves": [],
      "vulnerable_versions": "<2.3.1",
      "patched_versions": ">=2.3.1",
      "overview": "ReDoS",
      "recommendation": "Upgrade",
      "severity": "low",
      "cwe": "CWE-185",
      "url": "https://npmjs.com/advisories/786"
    }
  },
  "metadata": {}
}"#;

    fn loader(path: PathBuf) -> NpmAuditLoader {
        NpmAuditLoader::new(NpmAuditConfig { report_file: path })
    }

    #[test]
    fn test_one_issue_per_finding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-audit.json");
        std::fs::write(&path, REPORT).unwrap();

        let issues = loader(path).load().unwrap();
        assert_eq!(issues.len(), 3);

        let (lodash, braces) = issues.split_at(2);
        assert_eq!(lodash[0].identifier, "CVE-2019-10744");
        assert_eq!(lodash[1].identifier, lodash[0].identifier);
        assert_eq!(lodash[0].subject.location, "lodash");
        assert_eq!(lodash[1].subject.location, "async>lodash");
        assert_eq!(lodash[0].reference, "1065");
        assert_eq!(lodash[0].evidences, 2);
        assert_eq!(lodash[0].severity, Severity::High);
        assert_eq!(
            lodash[0].description,
            "Versions of lodash before 4.17.12 are vulnerable to Prototype Pollution."
        );
        assert_eq!(lodash[0].action, "Update to version 4.17.12 or later.");
        assert_eq!(
            lodash[0].subject.version,
            "Vulnerable versions: <4.17.12, Patched versions: >=4.17.12"
        );
        assert_eq!(
            lodash[0].source_date.map(|d| d.to_string()),
            Some("2019-07-02 21:05:36".to_string())
        );
        assert_eq!(lodash[0].tool.identifier, "npm_audit");

        // no CVE: identifier falls back to the title, reference to the key
        assert_eq!(braces[0].identifier, "Regular Expression Denial of Service");
        assert_eq!(braces[0].reference, "786");
        assert_eq!(braces[0].subject.location, "");
        assert_eq!(braces[0].severity, Severity::Low);
    }

    #[test]
    fn test_advisory_without_findings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-audit.json");
        std::fs::write(
            &path,
            r#"{"advisories": {"1": {"id": 1, "title": "t", "module_name": "m", "findings": []}}}"#,
        )
        .unwrap();
        assert!(loader(path).load().unwrap().is_empty());
    }

    #[test]
    fn test_missing_or_malformed_report() {
        let dir = tempfile::tempdir().unwrap();
        assert!(loader(dir.path().join("missing.json")).load().unwrap().is_empty());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"advisories": "#).unwrap();
        assert!(loader(path).load().unwrap().is_empty());

        let path = dir.path().join("shape.json");
        std::fs::write(&path, r#"{"vulnerabilities": {}}"#).unwrap();
        assert!(loader(path).load().unwrap().is_empty());
    }
}
