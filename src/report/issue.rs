use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use crate::report::fields::{FieldValue, FlatIssue, FLAT_FIELDS};
use crate::report::severity::Severity;

/// Format used to render and parse issue timestamps
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of hex characters kept from the identity digest
const HASH_LENGTH: usize = 32;

/// The scan tool that found an issue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tool {
    /// Scan tool id, e.g. "dependency_check"
    pub identifier: String,
    /// Display name
    pub name: String,
    pub version: String,
}

impl Tool {
    /// Flat names of the tool fields
    pub const FIELDS: &'static [&'static str] = &["tool_identifier", "tool_name", "tool_version"];

    pub fn new(identifier: &str, name: &str, version: &str) -> Self {
        Tool {
            identifier: identifier.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "identifier" => Some(&self.identifier),
            "name" => Some(&self.name),
            "version" => Some(&self.version),
            _ => None,
        }
    }
}

/// The subject affected by an issue (file, dependency, module, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    /// File path, fully qualified name, hash, ...
    pub identifier: String,
    /// Short name (class name, dependency name, ...)
    pub name: String,
    pub description: String,
    /// Version(s) of the subject affected by the issue
    pub version: String,
    /// Full file path, package path, URL, ...
    pub location: String,
    pub license: String,
}

impl Subject {
    pub const FIELDS: &'static [&'static str] = &[
        "subject_identifier",
        "subject_name",
        "subject_description",
        "subject_version",
        "subject_location",
        "subject_license",
    ];

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "identifier" => Some(&self.identifier),
            "name" => Some(&self.name),
            "description" => Some(&self.description),
            "version" => Some(&self.version),
            "location" => Some(&self.location),
            "license" => Some(&self.license),
            _ => None,
        }
    }
}

/// The scanned project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub identifier: String,
    pub name: String,
    pub version: String,
}

impl Project {
    pub const FIELDS: &'static [&'static str] =
        &["project_identifier", "project_name", "project_version"];

    pub fn new(identifier: &str, name: &str, version: &str) -> Self {
        Project {
            identifier: identifier.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "identifier" => Some(&self.identifier),
            "name" => Some(&self.name),
            "version" => Some(&self.version),
            _ => None,
        }
    }
}

/// User-defined annotations, identical for every issue of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub product: String,
    pub version: String,
    pub organization: String,
    pub client: String,
    pub audit_date: String,
}

impl Meta {
    pub const FIELDS: &'static [&'static str] = &[
        "meta_product",
        "meta_version",
        "meta_organization",
        "meta_client",
        "meta_audit_date",
    ];

    /// Build run metadata. The audit date defaults to now (second precision).
    pub fn new(
        product: &str,
        version: &str,
        organization: &str,
        client: &str,
        audit_date: Option<&str>,
    ) -> Self {
        let audit_date = match audit_date.map(str::trim) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ => chrono::Local::now().format(DATE_FORMAT).to_string(),
        };
        Meta {
            product: product.to_string(),
            version: version.to_string(),
            organization: organization.to_string(),
            client: client.to_string(),
            audit_date,
        }
    }

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "product" => Some(&self.product),
            "version" => Some(&self.version),
            "organization" => Some(&self.organization),
            "client" => Some(&self.client),
            "audit_date" => Some(&self.audit_date),
            _ => None,
        }
    }
}

/// A normalized issue reported by a tool about a subject in a project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Issue {
    /// Technical reference in the source tool
    pub reference: String,
    /// CVE, rule id, ...
    pub identifier: String,
    pub name: String,
    /// Issue type (UPPER_CASE), e.g. "VULNERABILITY"
    pub issue_type: String,
    /// e.g. a CWE
    pub category: String,
    pub description: String,
    pub more: String,
    /// Recommended action
    pub action: String,
    /// Effort needed to fix the issue (debt)
    pub effort: String,
    pub analysis_date: Option<NaiveDateTime>,
    pub severity: Severity,
    pub score: String,
    pub confidence: String,
    pub evidences: u32,
    /// Source database
    pub source: String,
    /// Advisory, rule or ticket creation date
    pub source_date: Option<NaiveDateTime>,
    pub url: String,
    pub tool: Tool,
    pub subject: Subject,
    pub project: Project,
    /// Set by the mixer after loading
    pub meta: Option<Meta>,
    /// Stable identity, set by the mixer after loading
    pub hash: Option<String>,
}

impl Issue {
    /// First-level scalar fields in declaration order.
    pub const FIELDS: &'static [&'static str] = &[
        "ref",
        "identifier",
        "name",
        "type",
        "category",
        "description",
        "more",
        "action",
        "effort",
        "analysis_date",
        "severity",
        "score",
        "confidence",
        "evidences",
        "source",
        "source_date",
        "url",
        "hash",
    ];

    /// Get the value of a flat field (e.g. "severity" or "subject_location").
    /// Unknown names yield `None`.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "ref" => FieldValue::Text(&self.reference),
            "identifier" => FieldValue::Text(&self.identifier),
            "name" => FieldValue::Text(&self.name),
            "type" => FieldValue::Text(&self.issue_type),
            "category" => FieldValue::Text(&self.category),
            "description" => FieldValue::Text(&self.description),
            "more" => FieldValue::Text(&self.more),
            "action" => FieldValue::Text(&self.action),
            "effort" => FieldValue::Text(&self.effort),
            "analysis_date" => FieldValue::from_date(self.analysis_date),
            "severity" => FieldValue::Severity(self.severity),
            "score" => FieldValue::Text(&self.score),
            "confidence" => FieldValue::Text(&self.confidence),
            "evidences" => FieldValue::Count(self.evidences),
            "source" => FieldValue::Text(&self.source),
            "source_date" => FieldValue::from_date(self.source_date),
            "url" => FieldValue::Text(&self.url),
            "hash" => self
                .hash
                .as_deref()
                .map_or(FieldValue::Absent, FieldValue::Text),
            _ => return self.sub_field(name),
        };
        Some(value)
    }

    fn sub_field(&self, name: &str) -> Option<FieldValue<'_>> {
        let (parent, child) = name.split_once('_')?;
        let value = match parent {
            "tool" => self.tool.get(child),
            "subject" => self.subject.get(child),
            "project" => self.project.get(child),
            "meta" => match &self.meta {
                Some(meta) => meta.get(child),
                None => return Meta::FIELDS.contains(&name).then_some(FieldValue::Absent),
            },
            _ => None,
        }?;
        Some(FieldValue::Text(value))
    }

    /// Flatten the issue into a single-level mapping in canonical field order.
    /// `meta_*` entries are only present once metadata has been attached.
    pub fn flatten(&self) -> FlatIssue<'_> {
        let entries = FLAT_FIELDS
            .iter()
            .filter(|name| self.meta.is_some() || !name.starts_with("meta_"))
            .filter_map(|name| self.field(name).map(|value| (*name, value)))
            .collect();
        FlatIssue::new(entries)
    }

    /// Compute a stable identity from the given fields.
    /// An empty field list disables identity tracking and yields an empty hash.
    pub fn compute_hash(&self, fields: &[&str]) -> String {
        if fields.is_empty() {
            return String::new();
        }
        let mut hasher = Sha256::new();
        for name in fields {
            if let Some(value) = self.field(name) {
                hasher.update(value.to_string().as_bytes());
            }
        }
        let hex = format!("{:x}", hasher.finalize());
        hex[..HASH_LENGTH].to_string()
    }
}
