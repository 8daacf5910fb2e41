use serde::Serialize;
use std::fmt;

/// Sentinel for a version or path that could not be resolved
pub const UNKNOWN: &str = "unknown";

/// Sentinel for a vulnerability that has no CVE identifier
pub const NOT_APPLICABLE: &str = "not applicable";

/// One normalized vulnerability observation tied to a dependency occurrence
///
/// Findings are derived from a stored scanner report and never persisted on
/// their own; the same report always yields the same findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub file: String,
    pub path: String,
    pub version: String,
    pub cve_id: String,
    /// Severity exactly as the scanner reported it. Use
    /// [`SeverityCategory::from_raw`] before grouping.
    pub severity: String,
    pub description: String,
}

impl Finding {
    pub fn severity_category(&self) -> Option<SeverityCategory> {
        SeverityCategory::from_raw(&self.severity)
    }
}

/// Fixed severity categories used for aggregation and presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SeverityCategory {
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityCategory {
    pub const ALL: [SeverityCategory; 4] = [
        SeverityCategory::Critical,
        SeverityCategory::High,
        SeverityCategory::Medium,
        SeverityCategory::Low,
    ];

    /// Case-insensitive mapping of a raw scanner severity.
    /// Anything outside the four categories maps to `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(SeverityCategory::Critical),
            "high" => Some(SeverityCategory::High),
            "medium" => Some(SeverityCategory::Medium),
            "low" => Some(SeverityCategory::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityCategory::Critical => "Critical",
            SeverityCategory::High => "High",
            SeverityCategory::Medium => "Medium",
            SeverityCategory::Low => "Low",
        }
    }
}

impl fmt::Display for SeverityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category finding counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    #[serde(rename = "Critical")]
    pub critical: usize,
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl SeverityCounts {
    /// Counts a raw severity; returns false when it is outside the fixed set
    pub fn record(&mut self, raw_severity: &str) -> bool {
        match SeverityCategory::from_raw(raw_severity) {
            Some(category) => {
                *self.slot(category) += 1;
                true
            }
            None => false,
        }
    }

    pub fn tally<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.record(&finding.severity);
        }
        counts
    }

    pub fn merge(&mut self, other: &SeverityCounts) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
    }

    pub fn get(&self, category: SeverityCategory) -> usize {
        match category {
            SeverityCategory::Critical => self.critical,
            SeverityCategory::High => self.high,
            SeverityCategory::Medium => self.medium,
            SeverityCategory::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    fn slot(&mut self, category: SeverityCategory) -> &mut usize {
        match category {
            SeverityCategory::Critical => &mut self.critical,
            SeverityCategory::High => &mut self.high,
            SeverityCategory::Medium => &mut self.medium,
            SeverityCategory::Low => &mut self.low,
        }
    }
}
