use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single loader. Most loaders log and return an empty list
/// instead; the self-format loader reports these to the mixer.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("report file path required")]
    MissingReportFile,

    #[error("file not found or not *.{extension}: {}", path.display())]
    NotFound { path: PathBuf, extension: &'static str },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse the report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to parse the report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid report: {0}")]
    Invalid(String),
}

/// Failure of a single exporter
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that make the whole run meaningless
#[derive(Error, Debug)]
pub enum MixError {
    #[error("invalid output directory {}", .0.display())]
    InvalidOutputDir(PathBuf),

    #[error("no issue has been loaded, nothing to export")]
    NothingToExport,
}

/// Configuration could not be built
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("configuration is incorrect:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Map an error to the process exit code:
/// 1 for configuration errors, 2 for everything else.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        1
    } else {
        2
    }
}
