use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load all configured reports, merge them and export the result
    Mix(MixArgs),

    /// Initialize a .reportmix.toml config file in the current directory
    Init,

    /// List the fields available for --fields and --hash
    ListFields,

    /// List the supported report sources and output formats
    ListSources,
}

/// Command-line overrides for the configuration file.
/// Every value left unset keeps the file (or default) value.
#[derive(clap::Args, Debug, Default)]
pub struct MixArgs {
    /// Path to the configuration file [default: .reportmix.toml]
    #[arg(short, long)]
    pub config_file: Option<PathBuf>,

    /// Directory where reports are written
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report formats to generate: csv, html, json (comma-separated)
    #[arg(short, long)]
    pub formats: Option<String>,

    /// Fields to include in the reports: "all" or comma-separated names
    #[arg(long)]
    pub fields: Option<String>,

    /// Fields used to compute the issue hash (comma-separated, "" to disable)
    #[arg(long)]
    pub hash: Option<String>,

    /// URL of the company logo displayed on the HTML report
    #[arg(long)]
    pub logo: Option<String>,

    /// Sources to load (comma-separated). Default: all
    #[arg(long)]
    pub sources: Option<String>,

    /// Export empty reports instead of failing when no issue is loaded
    #[arg(long)]
    pub allow_empty: bool,

    /// Product name
    #[arg(long)]
    pub product: Option<String>,

    /// Product version
    #[arg(long)]
    pub product_version: Option<String>,

    /// Organization name
    #[arg(long)]
    pub organization: Option<String>,

    /// Client name
    #[arg(long)]
    pub client: Option<String>,

    /// Audit date [default: now]
    #[arg(long)]
    pub audit_date: Option<String>,

    /// Dependency-Check CSV report
    #[arg(long)]
    pub dependency_check_report: Option<PathBuf>,

    /// npm audit JSON report
    #[arg(long)]
    pub npm_audit_report: Option<PathBuf>,

    /// Previous ReportMix CSV report
    #[arg(long)]
    pub reportmix_report: Option<PathBuf>,

    /// SonarQube server URL
    #[arg(long)]
    pub sonarqube_host_url: Option<String>,

    /// SonarQube login or authentication token
    #[arg(long)]
    pub sonarqube_login: Option<String>,

    /// SonarQube password
    #[arg(long)]
    pub sonarqube_password: Option<String>,

    /// SonarQube project key
    #[arg(long)]
    pub sonarqube_project_key: Option<String>,

    /// SonarQube issue types (CODE_SMELL, BUG, VULNERABILITY, SECURITY_HOTSPOT)
    #[arg(long)]
    pub sonarqube_types: Option<String>,

    /// SonarQube issue statuses (OPEN, CONFIRMED, REOPENED, RESOLVED, CLOSED, ...)
    #[arg(long)]
    pub sonarqube_statuses: Option<String>,
}
