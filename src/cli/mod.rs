pub mod commands;

use clap::Parser;

pub use commands::{Commands, MixArgs};

/// ReportMix — merge reports from multiple tools into one single file
///
/// Loads Dependency-Check, npm audit, SonarQube and previous ReportMix
/// reports, normalizes their issues and exports them as CSV, JSON or HTML.
#[derive(Parser, Debug)]
#[command(
    name = "reportmix",
    version,
    about = "Merge reports from multiple tools into one single file",
    long_about = "ReportMix loads reports from security and quality tools (Dependency-Check,\nnpm audit, SonarQube), normalizes their issues into a single schema and\nexports the merged list as CSV, JSON or HTML."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
