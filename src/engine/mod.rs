use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::ReportMixConfig;
use crate::error::MixError;
use crate::exporters::{self, Exporter};
use crate::loaders::{self, Loader};
use crate::report::fields::{select_fields_str, FLAT_FIELDS, HASH_FIELDS};
use crate::report::issue::{Issue, Meta};
use crate::report::severity::{Severity, SEVERITIES};

/// Outcome of one loader
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub name: String,
    pub count: usize,
    /// Set when the loader reported a failure
    pub error: Option<String>,
}

/// Outcome of one exporter
#[derive(Debug, Clone)]
pub struct OutputOutcome {
    pub format: String,
    pub path: PathBuf,
    pub error: Option<String>,
}

/// Result of a full mix run
#[derive(Debug)]
pub struct MixReport {
    pub version: String,
    pub duration_ms: u64,
    pub sources: Vec<SourceOutcome>,
    pub outputs: Vec<OutputOutcome>,
    /// Exported field projection
    pub fields: Vec<&'static str>,
    /// Merged issues, meta and hash attached
    pub issues: Vec<Issue>,
}

impl MixReport {
    /// Issue count per severity, in catalog order
    pub fn severity_counts(&self) -> Vec<(Severity, usize)> {
        let mut counts = [0usize; SEVERITIES.len()];
        for issue in &self.issues {
            counts[issue.severity.index()] += 1;
        }
        SEVERITIES.into_iter().zip(counts).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.sources.iter().any(|s| s.error.is_some()) || self.outputs.iter().any(|o| o.error.is_some())
    }
}

/// The mix engine. Runs the loaders, attaches run metadata and identity
/// hashes, then hands the merged issues to the exporters.
pub struct Mixer {
    /// Directory receiving reportmix.{format}
    output_dir: PathBuf,
    /// Loaders to run, in merge order
    loaders: Vec<Box<dyn Loader>>,
    exporters: Vec<Box<dyn Exporter>>,
    meta: Meta,
    hash_fields: Vec<&'static str>,
    fields: Vec<&'static str>,
    fail_on_empty: bool,
}

impl Mixer {
    pub fn new(config: &ReportMixConfig) -> Self {
        let loaders = loaders::loaders_by_names(config, &config.sources);
        info!(
            "Loaded {} sources: {}",
            loaders.len(),
            loaders.iter().map(|l| l.name()).collect::<Vec<_>>().join(", ")
        );

        let (exporters, unknown) =
            exporters::exporters_by_formats(&config.output.formats, config.output.logo.clone());
        for format in unknown {
            warn!("Unknown output format '{}', ignored", format);
        }

        let hash_fields = match config.output.hash {
            None => HASH_FIELDS.to_vec(),
            Some(ref hash) => select_fields_str(hash),
        };
        let fields = if config.output.fields.trim().eq_ignore_ascii_case("all") {
            FLAT_FIELDS.to_vec()
        } else {
            select_fields_str(&config.output.fields)
        };
        debug!("Hash fields: {:?}", hash_fields);
        debug!("Output fields: {:?}", fields);

        let meta = &config.meta;
        Mixer {
            output_dir: config.output.dir.clone(),
            loaders,
            exporters,
            meta: Meta::new(
                &meta.product,
                &meta.version,
                &meta.organization,
                &meta.client,
                meta.audit_date.as_deref(),
            ),
            hash_fields,
            fields,
            fail_on_empty: config.output.fail_on_empty,
        }
    }

    /// Run the full mix pipeline
    pub fn run(&self) -> Result<MixReport, MixError> {
        let start = Instant::now();

        // Step 1: Check the destination before doing any work
        let output_dir = std::fs::canonicalize(&self.output_dir)
            .ok()
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| MixError::InvalidOutputDir(self.output_dir.clone()))?;
        debug!("Output directory: {}", output_dir.display());

        // Step 2: Run all loaders (parallel, merged in configured order)
        let results: Vec<_> = self
            .loaders
            .par_iter()
            .map(|loader| (loader.name().to_string(), loader.load()))
            .collect();

        let mut sources = Vec::with_capacity(results.len());
        let mut issues = Vec::new();
        for (name, result) in results {
            match result {
                Ok(loaded) => {
                    info!("{}: {} issues", name, loaded.len());
                    sources.push(SourceOutcome {
                        name,
                        count: loaded.len(),
                        error: None,
                    });
                    issues.extend(loaded);
                }
                Err(e) => {
                    warn!("Failed to load {} report: {}", name, e);
                    sources.push(SourceOutcome {
                        name,
                        count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if issues.is_empty() {
            if self.fail_on_empty {
                return Err(MixError::NothingToExport);
            }
            warn!("No issue has been loaded, exporting empty reports");
        }
        info!("Merged {} issues", issues.len());

        // Step 3: Attach metadata, then the hash (which may use meta fields)
        for issue in &mut issues {
            issue.meta = Some(self.meta.clone());
            issue.hash = Some(issue.compute_hash(&self.hash_fields));
        }

        // Step 4: Export (parallel over formats)
        let outputs: Vec<_> = self
            .exporters
            .par_iter()
            .map(|exporter| {
                let path = output_dir.join(format!("reportmix.{}", exporter.format()));
                let error = match exporter.export(&issues, &path, &self.fields) {
                    Ok(()) => {
                        info!("Report written to {}", path.display());
                        None
                    }
                    Err(e) => {
                        error!("Failed to export {} report: {}", exporter.format(), e);
                        Some(e.to_string())
                    }
                };
                OutputOutcome {
                    format: exporter.format().to_string(),
                    path,
                    error,
                }
            })
            .collect();

        Ok(MixReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            sources,
            outputs,
            fields: self.fields.clone(),
            issues,
        })
    }
}
