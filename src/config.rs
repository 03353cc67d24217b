use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::MixArgs;
use crate::error::ConfigError;
use crate::exporters;
use crate::loaders::{self, sonarqube};

/// Default configuration file name
pub const CONFIG_FILE: &str = ".reportmix.toml";

/// ReportMix configuration (loaded from .reportmix.toml, overridden by the CLI)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportMixConfig {
    /// Loaders to run, in merge order
    pub sources: Vec<String>,

    pub output: OutputConfig,

    pub meta: MetaConfig,

    pub dependency_check: DependencyCheckConfig,

    pub npm_audit: NpmAuditConfig,

    pub sonarqube: SonarQubeConfig,

    pub reportmix: ReportMixSourceConfig,
}

impl Default for ReportMixConfig {
    fn default() -> Self {
        ReportMixConfig {
            sources: loaders::SOURCE_NAMES.iter().map(|s| s.to_string()).collect(),
            output: OutputConfig::default(),
            meta: MetaConfig::default(),
            dependency_check: DependencyCheckConfig::default(),
            npm_audit: NpmAuditConfig::default(),
            sonarqube: SonarQubeConfig::default(),
            reportmix: ReportMixSourceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory where reportmix.{format} files are written
    pub dir: PathBuf,

    /// Comma-separated output formats: csv, html, json
    pub formats: String,

    /// "all" or a comma-separated list of fields
    pub fields: String,

    /// Fields used to compute the issue hash (unset = default fields,
    /// empty = no hash)
    pub hash: Option<String>,

    /// Company logo URL for the HTML report
    pub logo: Option<String>,

    /// Abort when no issue has been loaded
    pub fail_on_empty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("./"),
            formats: "html".to_string(),
            fields: "all".to_string(),
            hash: None,
            logo: None,
            fail_on_empty: true,
        }
    }
}

/// User-defined metadata attached to every issue
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MetaConfig {
    pub product: String,
    pub version: String,
    pub organization: String,
    pub client: String,
    pub audit_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DependencyCheckConfig {
    /// Path to the CSV report (the JSON report is looked up next to it)
    pub report_file: PathBuf,
}

impl Default for DependencyCheckConfig {
    fn default() -> Self {
        DependencyCheckConfig {
            report_file: PathBuf::from("dependency-check-report.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NpmAuditConfig {
    /// Path to the `npm audit --json` output
    pub report_file: PathBuf,
}

impl Default for NpmAuditConfig {
    fn default() -> Self {
        NpmAuditConfig {
            report_file: PathBuf::from("npm-audit.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SonarQubeConfig {
    pub host_url: String,

    /// Login or authentication token
    pub login: Option<String>,

    pub password: Option<String>,

    pub project_key: Option<String>,

    /// Comma-separated issue types
    pub types: String,

    /// Comma-separated issue statuses
    pub statuses: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SonarQubeConfig {
    fn default() -> Self {
        SonarQubeConfig {
            host_url: "http://localhost:9000".to_string(),
            login: None,
            password: None,
            project_key: None,
            types: sonarqube::DEFAULT_TYPES.to_string(),
            statuses: sonarqube::DEFAULT_STATUSES.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Previous ReportMix CSV output to merge back in
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReportMixSourceConfig {
    pub report_file: Option<PathBuf>,
}

impl ReportMixConfig {
    /// Load the configuration file. A missing default file is not an error,
    /// a missing file that was explicitly requested is.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !path.exists() && !explicit {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(ReportMixConfig::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str::<ReportMixConfig>(&content).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Build the final configuration: defaults, then file, then command line.
    pub fn build(args: &MixArgs) -> Result<Self, ConfigError> {
        let (path, explicit) = match args.config_file {
            Some(ref path) => (path.clone(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };
        let mut config = ReportMixConfig::load(&path, explicit)?;
        config.apply_args(args);
        config.validate()?;
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Override values with the ones given on the command line
    pub fn apply_args(&mut self, args: &MixArgs) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        if let Some(ref sources) = args.sources {
            self.sources = sources.split(',').map(|s| s.trim().to_string()).collect();
        }

        set(&mut self.output.dir, &args.output_dir);
        set(&mut self.output.formats, &args.formats);
        set(&mut self.output.fields, &args.fields);
        set_opt(&mut self.output.hash, &args.hash);
        set_opt(&mut self.output.logo, &args.logo);
        if args.allow_empty {
            self.output.fail_on_empty = false;
        }

        set(&mut self.meta.product, &args.product);
        set(&mut self.meta.version, &args.product_version);
        set(&mut self.meta.organization, &args.organization);
        set(&mut self.meta.client, &args.client);
        set_opt(&mut self.meta.audit_date, &args.audit_date);

        set(&mut self.dependency_check.report_file, &args.dependency_check_report);
        set(&mut self.npm_audit.report_file, &args.npm_audit_report);
        set_opt(&mut self.reportmix.report_file, &args.reportmix_report);

        set(&mut self.sonarqube.host_url, &args.sonarqube_host_url);
        set_opt(&mut self.sonarqube.login, &args.sonarqube_login);
        set_opt(&mut self.sonarqube.password, &args.sonarqube_password);
        set_opt(&mut self.sonarqube.project_key, &args.sonarqube_project_key);
        set(&mut self.sonarqube.types, &args.sonarqube_types);
        set(&mut self.sonarqube.statuses, &args.sonarqube_statuses);
    }

    /// Check every property and report all problems at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.output.dir.as_os_str().is_empty() {
            problems.push("property 'output.dir' is required".to_string());
        }
        if !FORMAT_LIST.is_match(&self.output.formats) {
            problems.push(format!(
                "value of property 'output.formats' is invalid: '{}'",
                self.output.formats
            ));
        }
        if !FIELD_LIST.is_match(&self.output.fields) {
            problems.push(format!(
                "value of property 'output.fields' is invalid: '{}'",
                self.output.fields
            ));
        }
        if let Some(ref hash) = self.output.hash {
            if !hash.trim().is_empty() && !FIELD_LIST.is_match(hash) {
                problems.push(format!("value of property 'output.hash' is invalid: '{}'", hash));
            }
        }
        if !TYPE_LIST.is_match(&self.sonarqube.types) {
            problems.push(format!(
                "value of property 'sonarqube.types' is invalid: '{}'",
                self.sonarqube.types
            ));
        }
        if !STATUS_LIST.is_match(&self.sonarqube.statuses) {
            problems.push(format!(
                "value of property 'sonarqube.statuses' is invalid: '{}'",
                self.sonarqube.statuses
            ));
        }
        for source in &self.sources {
            if !loaders::SOURCE_NAMES.contains(&source.as_str()) {
                problems.push(format!("unknown source '{}'", source));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/// Comma-separated list of field names
static FIELD_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+,)*\w+$").expect("field list pattern is valid"));

static FORMAT_LIST: LazyLock<Regex> = LazyLock::new(|| list_of(exporters::FORMATS));

static TYPE_LIST: LazyLock<Regex> = LazyLock::new(|| list_of(sonarqube::TYPES));

static STATUS_LIST: LazyLock<Regex> = LazyLock::new(|| list_of(sonarqube::STATUSES));

/// Regex matching a comma-separated list of allowed values
fn list_of(allowed: &[&str]) -> Regex {
    let item = format!(
        "({})",
        allowed.iter().map(|a| regex::escape(a)).collect::<Vec<_>>().join("|")
    );
    Regex::new(&format!("^({},)*{}$", item, item)).expect("list pattern is valid")
}

/// Create a default .reportmix.toml in the current directory
pub fn init_config() -> Result<()> {
    let config_path = std::env::current_dir()?.join(CONFIG_FILE);

    if config_path.exists() {
        println!("⚠️  {} already exists in this directory", CONFIG_FILE);
        return Ok(());
    }

    let default_config = r#"# ReportMix configuration

# Reports to merge, in this order
sources = ["dependency_check", "npm_audit", "sonarqube", "reportmix"]

[output]
# Directory where reportmix.<format> files are written
dir = "./"

# Output formats: csv, html, json (comma-separated)
formats = "html"

# Fields to include: "all" or a comma-separated list (see `reportmix list-fields`)
fields = "all"

# Fields used to compute the issue hash (default: tool_identifier,subject_identifier,identifier)
# Set to "" to disable hashing.
# hash = "tool_identifier,subject_identifier,identifier"

# Company logo displayed on the HTML report
# logo = "https://example.org/logo.png"

# Abort when no issue has been loaded
fail_on_empty = true

[meta]
# product = ""
# version = ""
# organization = ""
# client = ""
# audit_date = "2020-01-01 00:00:00"

[dependency_check]
report_file = "dependency-check-report.csv"

[npm_audit]
report_file = "npm-audit.json"

[sonarqube]
host_url = "http://localhost:9000"
# login = ""
# password = ""
# project_key = ""
types = "VULNERABILITY"
statuses = "OPEN,CONFIRMED,REOPENED"
timeout_secs = 30

[reportmix]
# report_file = "previous/reportmix.csv"
"#;

    std::fs::write(&config_path, default_config)?;
    println!("✅ Created {}", CONFIG_FILE);
    println!("   Edit it to customize the merged report.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReportMixConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources, vec!["dependency_check", "npm_audit", "sonarqube", "reportmix"]);
        assert!(config.output.fail_on_empty);
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportMixConfig::load(&dir.path().join(CONFIG_FILE), false).unwrap();
        assert_eq!(config.output.formats, "html");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportMixConfig::load(&dir.path().join("custom.toml"), true).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
sources = ["npm_audit"]

[output]
formats = "csv,json"
hash = ""

[sonarqube]
project_key = "my:project"
"#
        )
        .unwrap();

        let config = ReportMixConfig::load(file.path(), true).unwrap();
        assert_eq!(config.sources, vec!["npm_audit"]);
        assert_eq!(config.output.formats, "csv,json");
        assert_eq!(config.output.fields, "all");
        assert_eq!(config.output.hash.as_deref(), Some(""));
        assert_eq!(config.sonarqube.project_key.as_deref(), Some("my:project"));
        assert_eq!(config.sonarqube.host_url, "http://localhost:9000");
        assert_eq!(config.npm_audit.report_file, PathBuf::from("npm-audit.json"));
    }

    #[test]
    fn test_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output\nformats = ").unwrap();
        let err = ReportMixConfig::load(file.path(), true).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let mut config = ReportMixConfig::default();
        let args = MixArgs {
            formats: Some("json".into()),
            sources: Some("sonarqube, reportmix".into()),
            sonarqube_project_key: Some("key".into()),
            reportmix_report: Some(PathBuf::from("old.csv")),
            product: Some("Shop".into()),
            allow_empty: true,
            ..MixArgs::default()
        };
        config.apply_args(&args);

        assert_eq!(config.output.formats, "json");
        assert_eq!(config.sources, vec!["sonarqube", "reportmix"]);
        assert_eq!(config.sonarqube.project_key.as_deref(), Some("key"));
        assert_eq!(config.reportmix.report_file, Some(PathBuf::from("old.csv")));
        assert_eq!(config.meta.product, "Shop");
        assert!(!config.output.fail_on_empty);
        // untouched values keep their defaults
        assert_eq!(config.output.fields, "all");
    }

    #[test]
    fn test_validation_collects_all_problems() {
        let mut config = ReportMixConfig::default();
        config.output.formats = "csv,pdf".into();
        config.output.fields = "name identifier".into();
        config.sonarqube.types = "BUG,FEATURE".into();
        config.sonarqube.statuses = "OPEN,CONFIRMED".into();
        config.sources.push("trivy".into());

        match config.validate() {
            Err(ConfigError::Invalid(problems)) => {
                assert_eq!(problems.len(), 4);
                assert!(problems.iter().any(|p| p.contains("output.formats")));
                assert!(problems.iter().any(|p| p.contains("output.fields")));
                assert!(problems.iter().any(|p| p.contains("sonarqube.types")));
                assert!(problems.iter().any(|p| p.contains("trivy")));
            }
            other => panic!("expected invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_list_validation() {
        let list = list_of(&["csv", "json"]);
        assert!(list.is_match("csv"));
        assert!(list.is_match("csv,json"));
        assert!(!list.is_match("csv,"));
        assert!(!list.is_match("csvx"));
        assert!(!list.is_match(""));
        assert!(FORMAT_LIST.is_match("html,csv"));
        assert!(!FIELD_LIST.is_match("name identifier"));
    }
}
