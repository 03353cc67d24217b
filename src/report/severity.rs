/// Severity level of an issue (based on CVSS v3 ratings)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    NotDefined,
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// The full severity catalog, lowest first.
pub const SEVERITIES: [Severity; 6] = [
    Severity::NotDefined,
    Severity::None,
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
];

impl Severity {
    /// Guess a severity from free text reported by a scanner.
    ///
    /// Empty input maps to `NotDefined`, unrecognized input to `None`
    /// (the caller decides what to do with it).
    pub fn classify(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Some(Severity::NotDefined);
        }
        match value.to_lowercase().as_str() {
            "info" | "none" => Some(Severity::None),
            "low" | "minor" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" | "major" => Some(Severity::High),
            "critical" | "blocker" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Look a severity up by its identifier (e.g. "HIGH").
    pub fn from_identifier(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Some(Severity::NotDefined);
        }
        SEVERITIES
            .iter()
            .copied()
            .find(|s| s.identifier().eq_ignore_ascii_case(value))
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Severity::NotDefined => "NOT_DEFINED",
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Severity::NotDefined => "Not Defined",
            Severity::None => "None",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// Position in the catalog
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
