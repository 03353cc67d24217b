use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::engine::MixReport;
use crate::report::severity::Severity;

/// Render a mix run summary to the terminal with colors
pub fn render(report: &MixReport) {
    println!();
    println!(
        "{}  ReportMix v{} — Merged {} issues in {:.2}s",
        "📋".bold(),
        report.version,
        report.issues.len(),
        report.duration_ms as f64 / 1000.0
    );
    println!();

    // Sources
    let mut sources = Table::new();
    sources
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Source", "Issues", "Status"]);
    for source in &report.sources {
        let status = match source.error {
            Some(ref e) => Cell::new(e).fg(Color::Red),
            None => Cell::new("ok").fg(Color::Green),
        };
        sources.add_row(vec![
            Cell::new(&source.name),
            Cell::new(source.count),
            status,
        ]);
    }
    println!("{}", sources);

    // Outputs
    println!("  {} {}", "Fields:".dimmed(), report.fields.join(", ").dimmed());
    for output in &report.outputs {
        match output.error {
            Some(ref e) => println!(
                "  {}  {} {}",
                "✗".red().bold(),
                output.format.to_uppercase().bold(),
                e.red()
            ),
            None => println!(
                "  {}  {} {}",
                "✓".green().bold(),
                output.format.to_uppercase().bold(),
                output.path.display().dimmed()
            ),
        }
    }
    println!();

    // Severity bar
    println!("{}", "━".repeat(60));
    let parts: Vec<String> = report
        .severity_counts()
        .into_iter()
        .rev()
        .filter(|(_, count)| *count > 0)
        .map(|(severity, count)| {
            let text = format!("{} {}", count, severity.name().to_lowercase());
            match severity {
                Severity::Critical => text.red().bold().to_string(),
                Severity::High => text.yellow().bold().to_string(),
                Severity::Medium => text.blue().to_string(),
                Severity::Low => text.white().to_string(),
                Severity::None | Severity::NotDefined => text.dimmed().to_string(),
            }
        })
        .collect();

    if parts.is_empty() {
        println!(" No issues");
    } else {
        println!(
            " {} issues: {}",
            report.issues.len().to_string().bold(),
            parts.join(", ")
        );
    }
    if report.has_failures() {
        println!(" {}", "Some sources or outputs failed, see above".yellow());
    }
    println!("{}", "━".repeat(60));
    println!();
}
