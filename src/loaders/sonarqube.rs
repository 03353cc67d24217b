use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::SonarQubeConfig;
use crate::error::LoadError;
use crate::loaders::{parse_iso_prefix, Loader};
use crate::report::issue::{Issue, Project, Subject, Tool};
use crate::report::severity::Severity;

/// Possible values of the `types` request parameter
pub const TYPES: &[&str] = &["CODE_SMELL", "BUG", "VULNERABILITY", "SECURITY_HOTSPOT"];
pub const DEFAULT_TYPES: &str = "VULNERABILITY";

/// Possible values of the `statuses` request parameter
pub const STATUSES: &[&str] = &[
    "OPEN",
    "CONFIRMED",
    "REOPENED",
    "RESOLVED",
    "CLOSED",
    "TO_REVIEW",
    "IN_REVIEW",
    "REVIEWED",
];
pub const DEFAULT_STATUSES: &str = "OPEN,CONFIRMED,REOPENED";

/// Number of issues per result page
const PAGE_SIZE: usize = 500;

/// The Web API refuses to page beyond 10 000 results
const MAX_ISSUES: usize = 10_000;

/// A Web API response body with the server version header
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    pub server_version: Option<String>,
}

/// Access to the SonarQube Web API
pub trait SonarApi: Send + Sync {
    /// GET `path` (e.g. "/api/issues/search") with the given query parameters
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, LoadError>;
}

/// Blocking HTTP client for a SonarQube server
pub struct HttpSonarApi {
    client: reqwest::blocking::Client,
    host_url: String,
    login: Option<String>,
    password: Option<String>,
}

impl HttpSonarApi {
    pub fn new(config: &SonarQubeConfig) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("reportmix/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpSonarApi {
            client,
            host_url: config.host_url.trim_end_matches('/').to_string(),
            login: config.login.clone().filter(|l| !l.is_empty()),
            password: config.password.clone(),
        })
    }
}

impl SonarApi for HttpSonarApi {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, LoadError> {
        let mut request = self
            .client
            .get(format!("{}{}", self.host_url, path))
            .query(query);
        if let Some(ref login) = self.login {
            request = request.basic_auth(login, self.password.as_ref());
        }

        let response = request.send()?.error_for_status()?;
        let server_version = response
            .headers()
            .get("Sonar-Version")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.json::<Value>()?;
        Ok(ApiResponse {
            body,
            server_version,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProjectSearch {
    components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Component {
    key: String,
    name: String,
    #[serde(default)]
    last_analysis_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueSearch {
    paging: Paging,
    issues: Vec<SonarIssue>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarIssue {
    key: String,
    rule: String,
    #[serde(rename = "type")]
    issue_type: String,
    #[serde(default)]
    severity: String,
    component: String,
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    effort: Option<String>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    creation_date: Option<String>,
}

/// SonarQube severities are finer-grained than the generic vocabulary
fn map_severity(value: &str) -> Severity {
    match value {
        "INFO" => Severity::None,
        "MINOR" => Severity::Low,
        "MAJOR" => Severity::Medium,
        "CRITICAL" => Severity::High,
        "BLOCKER" => Severity::Critical,
        _ => Severity::NotDefined,
    }
}

/// SonarQube project issues loader using the Web API.
pub struct SonarQubeLoader {
    config: SonarQubeConfig,
    api: Option<Box<dyn SonarApi>>,
}

impl SonarQubeLoader {
    pub fn new(config: SonarQubeConfig) -> Self {
        SonarQubeLoader { config, api: None }
    }

    /// Use a specific API client instead of the HTTP one
    #[cfg(test)]
    pub(crate) fn with_api(config: SonarQubeConfig, api: Box<dyn SonarApi>) -> Self {
        SonarQubeLoader {
            config,
            api: Some(api),
        }
    }

    fn fetch_project(&self, api: &dyn SonarApi, key: &str) -> Result<Component, LoadError> {
        let response = api.get("/api/projects/search", &[("q", key.to_string())])?;
        let search: ProjectSearch = serde_json::from_value(response.body)?;
        search
            .components
            .into_iter()
            .next()
            .ok_or_else(|| LoadError::Invalid(format!("project '{}' not found", key)))
    }

    fn fetch_issues(
        &self,
        api: &dyn SonarApi,
        key: &str,
        component: &Component,
    ) -> Result<Vec<Issue>, LoadError> {
        let project = Project::new(&component.key, &component.name, "");
        let analysis_date = component.last_analysis_date.as_deref().and_then(parse_iso_prefix);

        let mut issues = Vec::new();
        let mut page = 1;
        loop {
            let query = [
                ("componentKeys", key.to_string()),
                ("statuses", self.config.statuses.clone()),
                ("types", self.config.types.clone()),
                ("s", "SEVERITY".to_string()),
                ("asc", "false".to_string()),
                ("ps", PAGE_SIZE.to_string()),
                ("p", page.to_string()),
            ];
            debug!("Fetching SonarQube issues page {}", page);
            let response = api.get("/api/issues/search", &query)?;
            if response.body.get("paging").is_none() || response.body.get("issues").is_none() {
                return Err(LoadError::Invalid(
                    "server response is invalid ('paging' and 'issues' keys missing)".to_string(),
                ));
            }
            let search: IssueSearch = serde_json::from_value(response.body)?;
            let tool_version = response.server_version.unwrap_or_default();

            let fetched = (page - 1) * PAGE_SIZE + search.issues.len();
            debug!("Fetched {} / {} issues", fetched, search.paging.total);
            let page_was_empty = search.issues.is_empty();

            for issue in search.issues {
                issues.push(map_issue(issue, &tool_version, &project, analysis_date));
            }

            if page_was_empty || fetched >= search.paging.total || page * PAGE_SIZE >= MAX_ISSUES {
                break;
            }
            page += 1;
        }
        Ok(issues)
    }
}

fn map_issue(
    issue: SonarIssue,
    tool_version: &str,
    project: &Project,
    analysis_date: Option<chrono::NaiveDateTime>,
) -> Issue {
    let location = match issue.line {
        Some(line) => format!("{}:{}", issue.component, line),
        None => issue.component.clone(),
    };
    Issue {
        reference: issue.key,
        identifier: issue.rule.clone(),
        name: issue.rule.clone(),
        issue_type: issue.issue_type.clone(),
        category: issue.issue_type,
        description: issue.message.clone(),
        more: issue.tags.join(", "),
        action: issue.message,
        effort: issue.effort.unwrap_or_default(),
        analysis_date,
        severity: map_severity(&issue.severity),
        evidences: 1,
        source: issue.rule,
        source_date: issue.creation_date.as_deref().and_then(parse_iso_prefix),
        tool: Tool::new("sonarqube", "SonarQube", tool_version),
        subject: Subject {
            identifier: issue.hash.unwrap_or_default(),
            name: issue.component,
            location,
            ..Subject::default()
        },
        project: project.clone(),
        ..Issue::default()
    }
}

impl Loader for SonarQubeLoader {
    fn name(&self) -> &str {
        "sonarqube"
    }

    fn description(&self) -> &str {
        "SonarQube project issues fetched from the server Web API"
    }

    fn load(&self) -> Result<Vec<Issue>, LoadError> {
        let key = match self.config.project_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && !self.config.host_url.trim().is_empty() => key,
            _ => {
                warn!("SonarQube report ignored (required params: host_url, project_key)");
                return Ok(Vec::new());
            }
        };

        let http;
        let api: &dyn SonarApi = match self.api {
            Some(ref api) => api.as_ref(),
            None => match HttpSonarApi::new(&self.config) {
                Ok(client) => {
                    http = client;
                    &http
                }
                Err(e) => {
                    error!("Failed to create the SonarQube client ({})", e);
                    return Ok(Vec::new());
                }
            },
        };

        let component = match self.fetch_project(api, key) {
            Ok(component) => component,
            Err(e) => {
                error!("Failed to get SonarQube project information ({})", e);
                return Ok(Vec::new());
            }
        };

        match self.fetch_issues(api, key, &component) {
            Ok(issues) => Ok(issues),
            Err(e) => {
                error!("Failed to process SonarQube issues ({})", e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// In-memory Web API serving `total` generated issues
    struct FakeApi {
        total: usize,
        calls: Arc<Mutex<Vec<String>>>,
        broken_issues: bool,
    }

    impl FakeApi {
        fn new(total: usize) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let api = FakeApi {
                total,
                calls: Arc::clone(&calls),
                broken_issues: false,
            };
            (api, calls)
        }
    }

    fn param<'a>(query: &'a [(&str, String)], name: &str) -> &'a str {
        query
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    impl SonarApi for FakeApi {
        fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, LoadError> {
            self.calls.lock().unwrap().push(format!("{}?p={}", path, param(query, "p")));
            match path {
                "/api/projects/search" => Ok(ApiResponse {
                    body: json!({"components": [{
                        "key": param(query, "q"),
                        "name": "My Project",
                        "lastAnalysisDate": "2020-03-04T05:06:07+0100"
                    }]}),
                    server_version: Some("8.2.0".into()),
                }),
                "/api/issues/search" if self.broken_issues => Ok(ApiResponse {
                    body: json!({"errors": [{"msg": "nope"}]}),
                    server_version: None,
                }),
                "/api/issues/search" => {
                    let page: usize = param(query, "p").parse().unwrap();
                    let size: usize = param(query, "ps").parse().unwrap();
                    let start = (page - 1) * size;
                    let end = self.total.min(page * size);
                    let issues: Vec<Value> = (start..end)
                        .map(|i| {
                            json!({
                                "key": format!("AX-{}", i),
                                "rule": "java:S2068",
                                "type": "VULNERABILITY",
                                "severity": "BLOCKER",
                                "component": "my:project:src/Main.java",
                                "line": i + 1,
                                "message": "Remove this hard-coded password.",
                                "tags": ["cwe", "owasp-a3"],
                                "hash": format!("h{}", i),
                                "creationDate": "2020-01-02T03:04:05+0100"
                            })
                        })
                        .collect();
                    Ok(ApiResponse {
                        body: json!({"paging": {"pageIndex": page, "pageSize": size, "total": self.total}, "issues": issues}),
                        server_version: Some("8.2.0".into()),
                    })
                }
                _ => Err(LoadError::Invalid(format!("unexpected path {}", path))),
            }
        }
    }

    fn config() -> SonarQubeConfig {
        SonarQubeConfig {
            project_key: Some("my:project".into()),
            ..SonarQubeConfig::default()
        }
    }

    #[test]
    fn test_maps_issues() {
        let (api, _) = FakeApi::new(2);
        let issues = SonarQubeLoader::with_api(config(), Box::new(api)).load().unwrap();
        assert_eq!(issues.len(), 2);

        let issue = &issues[0];
        assert_eq!(issue.reference, "AX-0");
        assert_eq!(issue.identifier, "java:S2068");
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.more, "cwe, owasp-a3");
        assert_eq!(issue.effort, "");
        assert_eq!(issue.evidences, 1);
        assert_eq!(issue.tool.version, "8.2.0");
        assert_eq!(issue.tool.identifier, "sonarqube");
        assert_eq!(issue.subject.identifier, "h0");
        assert_eq!(issue.subject.location, "my:project:src/Main.java:1");
        assert_eq!(issue.project, Project::new("my:project", "My Project", ""));
        assert_eq!(
            issue.analysis_date.map(|d| d.to_string()),
            Some("2020-03-04 05:06:07".to_string())
        );
        assert_eq!(
            issue.source_date.map(|d| d.to_string()),
            Some("2020-01-02 03:04:05".to_string())
        );
    }

    #[test]
    fn test_pagination_stops_when_total_is_covered() {
        let (api, calls) = FakeApi::new(1200);
        let issues = SonarQubeLoader::with_api(config(), Box::new(api)).load().unwrap();
        assert_eq!(issues.len(), 1200);
        let calls = calls.lock().unwrap();
        // project lookup + 3 pages
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3], "/api/issues/search?p=3");
    }

    #[test]
    fn test_pagination_stops_at_exact_page_boundary() {
        let (api, calls) = FakeApi::new(1000);
        let issues = SonarQubeLoader::with_api(config(), Box::new(api)).load().unwrap();
        assert_eq!(issues.len(), 1000);
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_pagination_is_capped() {
        let (api, calls) = FakeApi::new(25_000);
        let issues = SonarQubeLoader::with_api(config(), Box::new(api)).load().unwrap();
        assert_eq!(issues.len(), MAX_ISSUES);
        assert_eq!(calls.lock().unwrap().len(), 1 + MAX_ISSUES / PAGE_SIZE);
    }

    #[test]
    fn test_no_issues() {
        let (api, calls) = FakeApi::new(0);
        let issues = SonarQubeLoader::with_api(config(), Box::new(api)).load().unwrap();
        assert!(issues.is_empty());
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_response_shape_degrades_to_empty() {
        let (mut api, _) = FakeApi::new(10);
        api.broken_issues = true;
        let issues = SonarQubeLoader::with_api(config(), Box::new(api)).load().unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_project_key_is_ignored() {
        let (api, calls) = FakeApi::new(10);
        let loader = SonarQubeLoader::with_api(SonarQubeConfig::default(), Box::new(api));
        assert!(loader.load().unwrap().is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_severity_map() {
        assert_eq!(map_severity("INFO"), Severity::None);
        assert_eq!(map_severity("MINOR"), Severity::Low);
        assert_eq!(map_severity("MAJOR"), Severity::Medium);
        assert_eq!(map_severity("CRITICAL"), Severity::High);
        assert_eq!(map_severity("BLOCKER"), Severity::Critical);
        assert_eq!(map_severity("whatever"), Severity::NotDefined);
    }
}
