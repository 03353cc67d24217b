use std::io::Write;
use std::path::Path;

use crate::error::ExportError;
use crate::exporters::{create_file, Exporter};
use crate::report::fields::FlatIssue;
use crate::report::issue::Issue;
use crate::report::severity::SEVERITIES;

/// Maximum number of characters displayed in a table cell
const CELL_LENGTH: usize = 64;

/// Everything the HTML template needs
#[derive(Debug)]
pub struct HtmlReport<'a> {
    pub title: &'a str,
    pub logo: Option<&'a str>,
    /// Flattened issues (projected when rendered)
    pub issues: Vec<FlatIssue<'a>>,
    pub fields: &'a [&'a str],
    /// Issue count by tool name (case-insensitive alphabetical)
    pub tools: Vec<(String, usize)>,
    /// Issue count by severity name (catalog order, zero counts included)
    pub severities: Vec<(&'static str, usize)>,
    /// Issue count by issue type (case-insensitive alphabetical)
    pub types: Vec<(String, usize)>,
}

impl<'a> HtmlReport<'a> {
    /// Build the report data. Breakdowns are computed over all issues,
    /// whatever the field selection.
    pub fn new(issues: &'a [Issue], fields: &'a [&'a str], logo: Option<&'a str>) -> Self {
        HtmlReport {
            title: "Issues Report",
            logo,
            issues: issues.iter().map(Issue::flatten).collect(),
            fields,
            tools: count_by(issues, |i| i.tool.name.as_str()),
            severities: SEVERITIES
                .iter()
                .map(|s| (s.name(), issues.iter().filter(|i| i.severity == *s).count()))
                .collect(),
            types: count_by(issues, |i| i.issue_type.as_str()),
        }
    }

    pub fn render(&self) -> String {
        let logo_html = match self.logo {
            Some(url) if !url.is_empty() => format!(
                r#"<img class="logo" src="{}" alt="logo">"#,
                html_escape(url)
            ),
            _ => String::new(),
        };

        let header_html: String = self
            .fields
            .iter()
            .map(|f| format!("<th>{}</th>", html_escape(&pretty_field(f))))
            .collect();

        let rows_html: String = self
            .issues
            .iter()
            .map(|issue| {
                let severity = issue
                    .get("severity")
                    .map(|s| s.to_string().to_lowercase())
                    .unwrap_or_default();
                let cells: String = issue
                    .project(self.fields)
                    .iter()
                    .map(|value| format!("<td>{}</td>", limit(value, CELL_LENGTH)))
                    .collect();
                format!(
                    "\n            <tr class=\"severity-{}\">{}</tr>",
                    severity, cells
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            color: #1f2937;
            background: #f3f4f6;
            padding: 2rem;
        }}
        header {{ display: flex; align-items: center; gap: 1rem; }}
        .logo {{ max-height: 48px; }}
        .summary {{ display: flex; gap: 2rem; margin: 1.5rem 0; }}
        table {{ border-collapse: collapse; background: white; }}
        th, td {{ border: 1px solid #e5e7eb; padding: 0.25rem 0.5rem; text-align: left; font-size: 0.85rem; }}
        th {{ background: #f9fafb; }}
        .severity-critical td {{ border-left: 3px solid #7f1d1d; }}
        .severity-high td {{ border-left: 3px solid #dc2626; }}
        .severity-medium td {{ border-left: 3px solid #ea580c; }}
        .severity-low td {{ border-left: 3px solid #ca8a04; }}
        .severity-none td {{ border-left: 3px solid #2563eb; }}
    </style>
</head>
<body>
    <header>
        {logo}
        <h1>{title}</h1>
    </header>
    <section class="summary">
        {tools}
        {severities}
        {types}
    </section>
    <section>
        <h2>Issues ({count})</h2>
        <table>
            <thead><tr>{header}</tr></thead>
            <tbody>{rows}
            </tbody>
        </table>
    </section>
</body>
</html>
"#,
            title = html_escape(self.title),
            logo = logo_html,
            tools = summary_table("Tools", self.tools.iter().map(|(k, v)| (k.as_str(), *v))),
            severities = summary_table("Severities", self.severities.iter().copied()),
            types = summary_table("Types", self.types.iter().map(|(k, v)| (k.as_str(), *v))),
            count = self.issues.len(),
            header = header_html,
            rows = rows_html,
        )
    }
}

/// Count issues by key, sorted by key (case-insensitive)
fn count_by<'i>(issues: &'i [Issue], key: impl Fn(&'i Issue) -> &'i str) -> Vec<(String, usize)> {
    let mut keys: Vec<&str> = issues.iter().map(&key).collect();
    keys.sort_by_cached_key(|k| (k.to_lowercase(), *k));
    keys.dedup();
    keys.into_iter()
        .map(|k| (k.to_string(), issues.iter().filter(|i| key(*i) == k).count()))
        .collect()
}

fn summary_table<'s>(title: &str, counts: impl Iterator<Item = (&'s str, usize)>) -> String {
    let rows: String = counts
        .map(|(name, count)| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                html_escape(name),
                count
            )
        })
        .collect();
    format!(
        "<table><thead><tr><th colspan=\"2\">{}</th></tr></thead><tbody>{}</tbody></table>",
        html_escape(title),
        rows
    )
}

/// Truncate long values to `max_length` characters. The full value is kept
/// in a tooltip.
pub fn limit(value: &str, max_length: usize) -> String {
    if value.chars().count() <= max_length {
        return html_escape(value);
    }
    let truncated: String = value.chars().take(max_length).collect();
    format!(
        r#"<span title="{}">{}...</span>"#,
        html_escape(value),
        html_escape(&truncated)
    )
}

/// Format a snake_case field name for display ("subject_identifier" -> "Subject id")
pub fn pretty_field(value: &str) -> String {
    let value = value.replace("meta_", "");
    let mut chars = value.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    capitalized.replace('_', " ").replace("identifier", "id")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Export the merged report to an HTML page with summary breakdowns.
pub struct HtmlExporter {
    logo: Option<String>,
}

impl HtmlExporter {
    pub fn new(logo: Option<String>) -> Self {
        HtmlExporter { logo }
    }
}

impl Exporter for HtmlExporter {
    fn format(&self) -> &str {
        "html"
    }

    fn export(&self, issues: &[Issue], destination: &Path, fields: &[&str]) -> Result<(), ExportError> {
        let report = HtmlReport::new(issues, fields, self.logo.as_deref());
        let mut file = create_file(destination)?;
        file.write_all(report.render().as_bytes())
            .map_err(|source| ExportError::Io {
                path: destination.to_path_buf(),
                source,
            })
    }
}
